use super::*;
use crate::config::StoreConfig;
use crate::handle::Payload;

fn store(block_slots: usize) -> ObjectStore {
    ObjectStore::new(&StoreConfig {
        block_slots,
        handle_block_slots: 4,
    })
}

// ===== Pool Tests =====

#[test]
fn test_pool_first_fit() {
    let mut pool: BlockPool<u8> = BlockPool::new(4, 8);

    let (a, grew) = pool.allocate(3);
    assert!(grew);
    assert_eq!((a.block, a.start, a.count), (0, 0, 3));

    let (b, grew) = pool.allocate(2);
    assert!(!grew);
    assert_eq!(b.start, 3);

    pool.release(a);
    let (c, _) = pool.allocate(2);
    assert_eq!((c.block, c.start), (0, 0));
}

#[test]
fn test_pool_grows_for_large_request() {
    let mut pool: BlockPool<u32> = BlockPool::new(1, 4);
    pool.allocate(3);

    let (big, grew) = pool.allocate(10);
    assert!(grew);
    assert_eq!(big.block, 1);

    let stats = pool.stats();
    assert_eq!(stats.blocks, 2);
    assert_eq!(stats.capacity, 14);
    assert_eq!(stats.live, 13);
}

#[test]
fn test_pool_release_resets_values() {
    let mut pool: BlockPool<u8> = BlockPool::new(2, 4);
    let (e, _) = pool.allocate(1);
    pool.values_mut(e).copy_from_slice(&[7, 9]);
    pool.release(e);
    assert!(!pool.is_live(e));

    let (again, _) = pool.allocate(1);
    assert_eq!(again, e);
    assert_eq!(pool.values(again), &[0, 0]);
}

// ===== Store Tests =====

#[test]
fn test_handles_round_trip() {
    let mut store = store(8);
    store.register(ClassId(3), &Storage::Bytes(4));

    let (instance, _) = store.allocate(ClassId(3), 1).unwrap();
    let id = store.insert(Handle::new(Payload::Scalar(instance)));

    assert!(store.contains(id));
    assert_eq!(store.get(id).unwrap().refs, 1);
    store.get_mut(id).unwrap().refs = 5;
    assert_eq!(store.get(id).unwrap().refs, 5);

    let handle = store.remove(id).unwrap();
    assert_eq!(handle.class(), ClassId(3));
    assert!(!store.contains(id));
    assert!(store.remove(id).is_none());
}

#[test]
fn test_abstract_class_has_no_storage() {
    let mut store = store(8);
    store.register(ClassId(0), &Storage::Abstract);
    store.register(ClassId(1), &Storage::Slots(0));
    assert!(store.allocate(ClassId(0), 1).is_none());
    assert!(store.allocate(ClassId(1), 1).is_none());
    assert!(store.allocate(ClassId(42), 1).is_none());
}

#[test]
fn test_cells_by_layout() {
    let mut store = store(8);
    store.register(ClassId(0), &Storage::Text);
    store.register(ClassId(1), &Storage::Slots(2));
    store.register(ClassId(2), &Storage::Components);

    let (text, _) = store.allocate(ClassId(0), 2).unwrap();
    match store.cells_mut(ClassId(0)).unwrap().data_mut(text.extent) {
        Some(DataMut::Text(values)) => values[1] = "hello".to_string(),
        _ => panic!("text pool expected"),
    }
    match store.cells(ClassId(0)).unwrap().data(text.element(1).extent) {
        Some(Data::Text(values)) => assert_eq!(values, &["hello".to_string()]),
        _ => panic!("text pool expected"),
    }

    let (slots, _) = store.allocate(ClassId(1), 3).unwrap();
    assert_eq!(store.cells(ClassId(1)).unwrap().slots(slots.extent).unwrap().len(), 6);

    let (comps, _) = store.allocate(ClassId(2), 1).unwrap();
    assert!(store
        .cells(ClassId(2))
        .unwrap()
        .components(comps.extent)
        .unwrap()
        .is_empty());
}

#[test]
fn test_stats_track_live_objects() {
    let mut store = store(8);
    store.register(ClassId(0), &Storage::Bytes(8));

    let (a, grew) = store.allocate(ClassId(0), 5).unwrap();
    assert!(grew);
    let id = store.insert(Handle::new(Payload::Scalar(a)));

    let stats = store.stats();
    assert_eq!(stats.handles, 1);
    assert_eq!(stats.elements, 5);
    assert_eq!(stats.blocks, 2);

    store.release(a);
    store.remove(id);
    let stats = store.stats();
    assert_eq!(stats.handles, 0);
    assert_eq!(stats.elements, 0);
}

#[test]
fn test_object_id_display() {
    let mut store = store(8);
    store.register(ClassId(0), &Storage::Bytes(1));
    let (a, _) = store.allocate(ClassId(0), 1).unwrap();

    let first = store.insert(Handle::new(Payload::Scalar(a)));
    let second = store.insert(Handle::new(Payload::Scalar(a)));
    assert_eq!(first.to_string(), "{0:0}");
    assert_eq!(second.to_string(), "{0:1}");
}
