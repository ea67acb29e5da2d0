use adi::config::RuntimeConfig;
use adi::{ErrorKind, Runtime};

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

#[test]
fn test_refcount_lifecycle() {
    let mut rt = runtime();
    let baseline = rt.stats().objects;

    let id = rt.new_value(42i32).unwrap();
    assert_eq!(rt.refcount(id).unwrap(), 1);

    let same = rt.clone_ref(id).unwrap();
    assert_eq!(same, id);
    assert_eq!(rt.refcount(id).unwrap(), 2);

    rt.erase(id).unwrap();
    assert!(rt.is_valid(id));
    assert_eq!(rt.get_value::<i32>(id, "").unwrap(), 42);

    rt.erase(id).unwrap();
    assert!(!rt.is_valid(id));
    assert_eq!(rt.stats().objects, baseline);

    let err = rt.get_value::<i32>(id, "").unwrap_err();
    assert!(err.is(ErrorKind::InvalidArgument));
}

#[test]
fn test_structure_tree_released_with_root() {
    let mut rt = runtime();
    rt.define_class("Point", "", "DOUBLE x, DOUBLE y").unwrap();
    rt.define_class("Segment", "", "Point start, Point end, label").unwrap();
    let baseline = rt.stats().objects;

    let seg = rt.new_object("Segment", &[]).unwrap();
    let start = rt.find(seg, "start").unwrap();
    rt.put_value(start, "x", 1.0f64).unwrap();
    rt.erase(start).unwrap();
    let end = rt.find(seg, "end").unwrap();
    rt.put_value(end, "y", 2.5f64).unwrap();
    rt.put_str(seg, "label", "diagonal").unwrap();
    rt.put_str(seg, ".origin", "survey").unwrap();

    assert_eq!(rt.get_value::<f64>(end, "y").unwrap(), 2.5);
    rt.erase(end).unwrap();
    assert_eq!(rt.get_string(seg, "label").unwrap(), "diagonal");
    assert!(rt.stats().objects > baseline);

    rt.erase(seg).unwrap();
    assert_eq!(rt.stats().objects, baseline);
}

#[test]
fn test_narrowing_transfer_counts_bad_elements() {
    let mut rt = runtime();
    let id = rt.new_object("WORD", &[4]).unwrap();

    let err = rt
        .put_values(id, "", &[1.0f64, 2.0, 1.0e9, 4.0], &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion { count: 1 });

    let values = rt.get_values::<i16>(id, "").unwrap();
    assert_eq!(values[0], 1);
    assert_eq!(values[3], 4);
}

#[test]
fn test_widening_round_trip() {
    let mut rt = runtime();
    let id = rt.new_object("DOUBLE", &[3]).unwrap();

    rt.put_values(id, "", &[-3i32, 0, 70_000], &[]).unwrap();
    assert_eq!(rt.get_values::<f64>(id, "").unwrap(), vec![-3.0, 0.0, 70_000.0]);
    assert_eq!(rt.get_values::<i32>(id, "").unwrap(), vec![-3, 0, 70_000]);
}

#[test]
fn test_properties_are_name_ordered() {
    let mut rt = runtime();
    let id = rt.new_value(1.5f32).unwrap();
    for name in [".zeta", ".alpha", ".mu"] {
        rt.put_value(id, name, 0i32).unwrap();
    }

    let names: Vec<String> = rt
        .property_names(id)
        .unwrap()
        .iter()
        .map(|n| n.to_string())
        .collect();
    assert_eq!(names, vec!["alpha", "mu", "zeta"]);
}

#[test]
fn test_map_conflicts_and_release() {
    let mut rt = runtime();
    let id = rt.new_values(&[1i32, 2, 3], &[]).unwrap();

    let token = rt.map(id, "", "UPDATE", "INTEGER").unwrap();
    let err = rt.map(id, "", "READ", "INTEGER").unwrap_err();
    assert!(err.is(ErrorKind::AlreadyMapped));

    rt.unmap(id, "", Some(&token)).unwrap();
    let token = rt.map(id, "", "READ", "INTEGER").unwrap();
    rt.unmap(id, "", Some(&token)).unwrap();
}

#[test]
fn test_member_narrowing_requires_derived_class() {
    let mut rt = runtime();
    rt.define_class("Unit", "", "name").unwrap();
    rt.define_class("SiUnit", "Unit", "").unwrap();
    rt.define_class("Quantity", "", "DOUBLE value*, Unit unit").unwrap();

    let metric = rt.define_class("Metric", "Quantity", "SiUnit unit").unwrap();
    let si = rt.find_class("SiUnit").unwrap();
    assert_eq!(rt.class_def(metric).unwrap().members[1].class, Some(si));

    let err = rt.define_class("Broken", "Quantity", "INTEGER unit").unwrap_err();
    assert_eq!(
        err.message(),
        "The initialisation class of member unit must be derived from Unit"
    );

    // The default member receives writes addressed to the object
    let q = rt.new_object("Metric", &[]).unwrap();
    rt.put_value(q, "", 9.81f64).unwrap();
    assert_eq!(rt.get_value::<f64>(q, "value").unwrap(), 9.81);
    assert!(rt.object_derived_from(q, "Quantity").unwrap());
}

#[test]
fn test_small_blocks_grow_on_demand() {
    let mut config = RuntimeConfig::default();
    config.store.block_slots = 2;
    let mut small = Runtime::with_config(config).unwrap();
    let mut large = runtime();

    for i in 0..9 {
        small.new_value(i).unwrap();
        large.new_value(i).unwrap();
    }
    assert_eq!(small.stats().objects, large.stats().objects);
    assert!(small.stats().blocks > large.stats().blocks);
}
