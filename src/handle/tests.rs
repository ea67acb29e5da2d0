use super::*;
use crate::error::ErrorKind;
use crate::intern::Interner;
use crate::mta::{decode_all, Data, DataMut, Element};
use crate::runtime::Runtime;
use crate::store::ObjectId;

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn ints(data: Data<'_>) -> Vec<i32> {
    match data {
        Data::Bytes(bytes) => decode_all(bytes),
        Data::Text(_) => panic!("expected numeric data"),
    }
}

// ===== Assoc List Tests =====

#[test]
fn test_assoc_list_stays_sorted() {
    let strings = Interner::with_capacity(8);
    let mut list = AssocList::new();
    for name in ["zebra", "apple", "mango"] {
        list.insert(strings.intern(name), name.into());
    }

    let names: Vec<&str> = list.iter().map(|e| &*e.name).collect();
    assert_eq!(names, vec!["apple", "mango", "zebra"]);
    assert_eq!(list.get(1).map(|e| &*e.name), Some("mango"));
    assert!(list.contains("zebra"));
    assert!(!list.contains("banana"));
}

#[test]
fn test_assoc_insert_existing_keeps_entry() {
    let mut rt = runtime();
    let id = rt.new_value(1i32).unwrap();
    let strings = Interner::with_capacity(8);
    let mut list = AssocList::new();
    let symbol = strings.intern("a");

    list.insert(symbol, "a".into()).value = Some(id);
    let entry = list.insert(symbol, "a".into());
    assert_eq!(entry.value, Some(id));
    assert_eq!(list.len(), 1);

    assert!(list.remove("a").is_some());
    assert!(list.remove("a").is_none());
    assert!(list.is_empty());
}

// ===== Locate Tests =====

#[test]
fn test_locate_namespaces() {
    let mut rt = runtime();
    let id = rt.new_value(1i32).unwrap();

    assert_eq!(rt.locate(id, "", LocateMode::DEFAULT).unwrap(), Slot::Value(id));
    assert_eq!(rt.locate(id, "  ", LocateMode::DEFAULT).unwrap(), Slot::Value(id));

    let err = rt.locate(id, "", LocateMode::ARRAY).unwrap_err();
    assert_eq!(err.message(), "Array object expected");

    let err = rt.locate(id, ".units", LocateMode::DEFAULT).unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let slot = rt.locate(id, ".units", LocateMode::CREATE).unwrap();
    assert!(matches!(slot, Slot::Property { owner, .. } if owner == id));
    assert_eq!(slot.owner(), id);
    // Locating alone does not create the property
    assert_eq!(rt.count_properties(id).unwrap(), 0);
}

#[test]
fn test_locate_members() {
    let mut rt = runtime();
    rt.define_class("Point", "", "INTEGER x, INTEGER y").unwrap();
    let p = rt.new_object("Point", &[]).unwrap();

    let slot = rt.locate(p, "y", LocateMode::DEFAULT).unwrap();
    assert_eq!(slot, Slot::Member { owner: p, index: 1 });
    assert!(rt.slot_value(slot).unwrap().is_some());

    let err = rt.locate(p, "yy", LocateMode::CREATE).unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    assert!(!err.suggestions().is_empty());
}

// ===== Access Mode Tests =====

#[test]
fn test_access_mode_prefixes() {
    assert_eq!("r".parse::<AccessMode>().unwrap(), AccessMode::Read);
    assert_eq!("Write".parse::<AccessMode>().unwrap(), AccessMode::Write);
    assert_eq!("upDATE".parse::<AccessMode>().unwrap(), AccessMode::Update);

    let err = "reads".parse::<AccessMode>().unwrap_err();
    assert_eq!(err.message(), "Invalid access mode /reads/");
    assert!("".parse::<AccessMode>().is_err());
    assert_eq!(AccessMode::Update.to_string(), "UPDATE");
}

// ===== Mapping Tests =====

#[test]
fn test_map_read_direct() {
    let mut rt = runtime();
    let id = rt.new_values(&[1i32, 2, 3], &[]).unwrap();

    let token = rt.map(id, "", "READ", "INTEGER").unwrap();
    assert_eq!(ints(rt.mapped(&token).unwrap()), vec![1, 2, 3]);

    let err = rt.mapped_mut(&token).unwrap_err();
    assert_eq!(err.message(), "Object is mapped for READ access only");
    rt.unmap(id, "", Some(&token)).unwrap();
}

#[test]
fn test_repeated_read_shares_lock() {
    let mut rt = runtime();
    let id = rt.new_values(&[1i32, 2], &[]).unwrap();

    let first = rt.map(id, "", "READ", "INTEGER").unwrap();
    let second = rt.map(id, "", "READ", "INTEGER").unwrap();
    assert_eq!(first, second);

    rt.unmap(id, "", Some(&first)).unwrap();
    assert_eq!(ints(rt.mapped(&second).unwrap()), vec![1, 2]);
    rt.unmap(id, "", Some(&second)).unwrap();

    let err = rt.unmap(id, "", Some(&second)).unwrap_err();
    assert_eq!(err.message(), "Object is not mapped");
}

#[test]
fn test_map_conflicts() {
    let mut rt = runtime();
    let id = rt.new_values(&[1i32, 2], &[]).unwrap();

    let read = rt.map(id, "", "READ", "INTEGER").unwrap();
    let err = rt.map(id, "", "WRITE", "INTEGER").unwrap_err();
    assert!(err.is(ErrorKind::AlreadyMapped));
    assert_eq!(err.message(), "Object is already mapped for READ access");

    // A second READ in another type is allowed
    let other = rt.map(id, "", "READ", "DOUBLE").unwrap();
    rt.unmap(id, "", Some(&other)).unwrap();
    rt.unmap(id, "", Some(&read)).unwrap();

    let update = rt.map(id, "", "UPDATE", "INTEGER").unwrap();
    let err = rt.map(id, "", "READ", "INTEGER").unwrap_err();
    assert_eq!(err.message(), "Object is already mapped for UPDATE access");
    rt.unmap(id, "", Some(&update)).unwrap();
}

#[test]
fn test_map_update_converts_back() {
    let mut rt = runtime();
    let id = rt.new_values(&[1i32, 2, 3], &[]).unwrap();

    let token = rt.map(id, "", "upd", "DOUBLE").unwrap();
    if let DataMut::Bytes(bytes) = rt.mapped_mut(&token).unwrap() {
        for chunk in bytes.chunks_exact_mut(8) {
            let x = f64::read(chunk);
            (x * 2.0).write(chunk);
        }
    }
    // Object storage is untouched until unmap
    assert_eq!(rt.get_values::<i32>(id, "").unwrap(), vec![1, 2, 3]);

    rt.unmap(id, "", Some(&token)).unwrap();
    assert_eq!(rt.get_values::<i32>(id, "").unwrap(), vec![2, 4, 6]);
}

#[test]
fn test_map_write_sets_data() {
    let mut rt = runtime();
    let id = rt.new_object("REAL", &[2]).unwrap();

    let token = rt.map(id, "", "w", "REAL").unwrap();
    if let DataMut::Bytes(bytes) = rt.mapped_mut(&token).unwrap() {
        0.5f32.write(&mut bytes[..4]);
        1.5f32.write(&mut bytes[4..]);
    }
    assert!(!rt.is_set(id).unwrap());

    rt.unmap(id, "", None).unwrap();
    assert!(rt.is_set(id).unwrap());
    assert_eq!(rt.get_values::<f32>(id, "").unwrap(), vec![0.5, 1.5]);
}

#[test]
fn test_map_slice_through_scratch() {
    let mut rt = runtime();
    let id = rt.new_values(&[1i32, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
    let row = rt.slice(id, "", &[2, 1], &[2, 3]).unwrap();

    let token = rt.map(row, "", "UPDATE", "INTEGER").unwrap();
    assert_eq!(ints(rt.mapped(&token).unwrap()), vec![2, 4, 6]);
    if let DataMut::Bytes(bytes) = rt.mapped_mut(&token).unwrap() {
        0i32.write(&mut bytes[..4]);
    }
    rt.unmap(row, "", Some(&token)).unwrap();

    assert_eq!(rt.get_values::<i32>(id, "").unwrap(), vec![1, 0, 3, 4, 5, 6]);
}

#[test]
fn test_map_errors() {
    let mut rt = runtime();

    let unset = rt.new_object("INTEGER", &[]).unwrap();
    let err = rt.map(unset, "", "READ", "INTEGER").unwrap_err();
    assert!(err.is(ErrorKind::NotSet));

    let err = rt.map(unset, "", "READ", "STRUC").unwrap_err();
    assert!(err.is(ErrorKind::NotSet));

    let value = rt.new_value(1i32).unwrap();
    let err = rt.map(value, "", "READ", "STRUC").unwrap_err();
    assert_eq!(err.message(), "Cannot map data of type STRUC");

    let err = rt.map(value, "", "X", "INTEGER").unwrap_err();
    assert_eq!(err.message(), "Invalid access mode /X/");

    rt.set_readonly(value, true).unwrap();
    let err = rt.map(value, "", "WRITE", "INTEGER").unwrap_err();
    assert!(err.is(ErrorKind::ReadOnly));

    rt.define_class("Bag", "", "a").unwrap();
    let bag = rt.new_object("Bag", &[]).unwrap();
    let err = rt.map(bag, "a", "READ", "INTEGER").unwrap_err();
    assert_eq!(err.message(), "Cannot map an object with no data");

    let err = rt.unmap(value, "", None).unwrap_err();
    assert_eq!(err.message(), "Object is not mapped");
}
