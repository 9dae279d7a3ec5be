use std::{
    sync::{Arc, Barrier},
    thread,
};

use native_bridge::{
    ClassHandle, ClassSlot, HostRuntime, MethodSite, Runtime, RuntimeConfig, Unwind,
    host::memory::{ClassDef, MemoryHost},
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup(budget: usize) -> (Arc<MemoryHost>, Runtime) {
    init_logger();
    let host = Arc::new(MemoryHost::new());
    host.define_class(ClassDef::interface("demo/Task").method("run", "()V"))
        .unwrap();
    host.define_class(
        ClassDef::new("demo/Worker")
            .implements("demo/Task")
            .field("id", "I")
            .method("run", "()V")
            .static_method("spawn", "(I)Ldemo/Worker;"),
    )
    .unwrap();
    for i in 0..8 {
        host.define_class(ClassDef::new(format!("demo/Job{i}"))).unwrap();
    }
    let config = RuntimeConfig::default().with_reference_budget(budget);
    let runtime = Runtime::new(host.clone(), config).unwrap();
    (host, runtime)
}

#[test]
fn concurrent_resolution_of_a_new_class_pins_once() {
    const THREADS: usize = 16;
    let (host, runtime) = setup(64);
    let pinned_before = host.pinned_count();
    let barrier = Barrier::new(THREADS);

    let handles: Vec<ClassHandle> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    let slot = ClassSlot::new();
                    barrier.wait();
                    runtime.resolve_class(&slot, "demo/Worker").unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert!(handles.iter().all(|h| *h == handles[0]));
    assert!(handles[0].is_pinned());
    assert_eq!(runtime.symbols().class_count(), 1);
    assert_eq!(runtime.symbols().budget().pinned(), 1);
    assert_eq!(host.pinned_count(), pinned_before + 1);
    assert_eq!(host.transient_count(), 0);
}

#[test]
fn concurrent_resolution_through_a_shared_site() {
    const THREADS: usize = 8;
    let (host, runtime) = setup(64);
    let site = MethodSite::new();
    let barrier = Barrier::new(THREADS);

    let ids: Vec<_> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    runtime
                        .resolve_method(&site, "demo/Worker", "run", "()V")
                        .unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(site.member.get(), Some(ids[0]));
    assert_eq!(runtime.symbols().method_count(), 1);
    assert_eq!(runtime.symbols().class_count(), 1);
    assert!(!host.exception_pending());
}

#[test]
fn second_resolution_skips_the_host() {
    let (host, runtime) = setup(64);
    runtime
        .resolve_static_method(&MethodSite::new(), "demo/Worker", "spawn", "(I)Ldemo/Worker;")
        .unwrap();
    let classes = host.class_lookup_count();
    let methods = host.method_lookup_count();

    runtime
        .resolve_static_method(&MethodSite::new(), "demo/Worker", "spawn", "(I)Ldemo/Worker;")
        .unwrap();
    runtime
        .resolve_class(&ClassSlot::new(), "demo/Worker")
        .unwrap();
    assert_eq!(host.class_lookup_count(), classes);
    assert_eq!(host.method_lookup_count(), methods);
}

#[test]
fn budget_overflow_is_transient() {
    const BUDGET: usize = 5;
    let (host, runtime) = setup(BUDGET);
    let handles: Vec<_> = (0..=BUDGET)
        .map(|i| {
            runtime
                .resolve_class(&ClassSlot::new(), &format!("demo/Job{i}"))
                .unwrap()
        })
        .collect();

    assert!(handles[..BUDGET].iter().all(|h| h.is_pinned()));
    let overflow = handles[BUDGET];
    assert!(!overflow.is_pinned());
    assert_eq!(runtime.symbols().class_count(), BUDGET);
    assert_eq!(runtime.symbols().cached_class(&format!("demo/Job{BUDGET}")), None);

    runtime.release(overflow);
    assert_eq!(host.transient_count(), 0);
}

#[test]
fn primitive_aliases_never_reach_the_host() {
    let (host, runtime) = setup(64);
    for alias in ["Int", "Long", "Boolean", "Double"] {
        let handle = runtime.resolve_class(&ClassSlot::new(), alias).unwrap();
        assert!(handle.is_pinned());
        assert_eq!(host.class_lookup_count_for(alias), 0);
    }
    let int = runtime.resolve_class(&ClassSlot::new(), "Int").unwrap();
    assert_eq!(host.mirror_name(int.get()).as_deref(), Some("int"));
    assert_eq!(runtime.symbols().class_count(), 0);
}

#[test]
fn missing_symbols_surface_as_linkage_errors() {
    let (host, runtime) = setup(64);
    let cases = [
        ("demo/Missing", "run", "java/lang/NoClassDefFoundError"),
        ("demo/Worker", "stop", "java/lang/NoSuchMethodError"),
    ];
    for throw in [true, false] {
        host.set_lookup_failures_throw(throw);
        for (owner, name, expected) in cases {
            let err = runtime
                .resolve_method(&MethodSite::new(), owner, name, "()V")
                .unwrap_err();
            assert!(matches!(err, Unwind::Resolution(_)));
            let exception = host.take_exception().unwrap();
            assert_eq!(
                host.describe_exception(exception).unwrap().class_name.as_ref(),
                expected
            );
            // exactly one exception was raised
            assert!(!host.exception_pending());
        }
    }

    let err = runtime
        .resolve_field(&native_bridge::FieldSite::new(), "demo/Worker", "id", "J")
        .unwrap_err();
    assert_eq!(err.to_string(), "field not found: demo/Worker.id:J");
    assert_eq!(
        host.pending_exception().unwrap().class_name.as_ref(),
        "java/lang/NoSuchFieldError"
    );
}
