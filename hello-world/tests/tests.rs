use kernel_module_testlib::{kernel_module, KernelLog, LoadedModule};

#[test]
fn insert_and_remove_greet_exactly_once() {
    let Some(path) = kernel_module() else {
        eprintln!("KERNEL_MODULE not usable, skipping");
        return;
    };
    let log = KernelLog::mark();

    {
        let module = LoadedModule::insert(&path);
        assert_eq!(module.name(), "hello");
        assert_eq!(log.count("Hello, world!"), 1);
        assert_eq!(log.count("Goodbye, world!"), 0);
    }

    assert_eq!(log.count("Hello, world!"), 1);
    assert_eq!(log.count("Goodbye, world!"), 1);
    let ours: Vec<_> = log
        .lines()
        .into_iter()
        .filter(|l| l.ends_with("world!"))
        .collect();
    assert_eq!(ours, ["Hello, world!", "Goodbye, world!"]);
}
