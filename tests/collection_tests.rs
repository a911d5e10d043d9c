//! Ordered groups of device handles.

use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

use unique_devptr::{DevPtrSliceExt, Ownership, ReleaseFn, UniqueDevPtr, UniqueDevPtrs};

type Log = Arc<Mutex<Vec<usize>>>;

fn recorder() -> (Log, ReleaseFn<impl Fn(NonNull<u8>) + Clone>) {
    let log: Log = Arc::default();
    let sink = log.clone();
    let release = ReleaseFn(move |p: NonNull<u8>| sink.lock().unwrap().push(p.as_ptr() as usize));
    (log, release)
}

#[test]
fn test_group_releases_in_order() {
    let (log, release) = recorder();

    let mut group: UniqueDevPtrs<f32, _> = Vec::new();
    for addr in [0x10usize, 0x20, 0x30] {
        let ptr = addr as *mut f32;
        group.push(unsafe { UniqueDevPtr::from_raw_in(ptr, Ownership::Owned, release.clone()) });
    }
    assert_eq!(group.len(), 3);
    assert_eq!(group[1].as_ptr() as usize, 0x20);

    drop(group);
    assert_eq!(*log.lock().unwrap(), vec![0x10, 0x20, 0x30]);
}

#[test]
fn test_raw_ptrs_preserve_order() {
    let (log, release) = recorder();

    let group: UniqueDevPtrs<u32, _> = vec![
        UniqueDevPtr::fake_in(0x300 as *mut u32, release.clone()),
        UniqueDevPtr::null_in(release.clone()),
        UniqueDevPtr::fake_in(0x100 as *mut u32, release),
    ];

    let addrs: Vec<usize> = group.raw_ptrs().into_iter().map(|p| p as usize).collect();
    assert_eq!(addrs, vec![0x300, 0, 0x100]);

    drop(group);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_alias_alongside_owner() {
    let (log, release) = recorder();

    let owner =
        unsafe { UniqueDevPtr::from_raw_in(0x40 as *mut u8, Ownership::Owned, release.clone()) };
    let alias = UniqueDevPtr::fake_in(owner.as_ptr(), release);
    let group: UniqueDevPtrs<u8, _> = vec![owner, alias];

    drop(group);
    assert_eq!(*log.lock().unwrap(), vec![0x40]);
}

#[test]
fn test_remove_and_truncate_release() {
    let (log, release) = recorder();

    let mut group: UniqueDevPtrs<u8, _> = (1..=4usize)
        .map(|i| unsafe {
            UniqueDevPtr::from_raw_in((i * 0x100) as *mut u8, Ownership::Owned, release.clone())
        })
        .collect();

    drop(group.remove(1));
    assert_eq!(*log.lock().unwrap(), vec![0x200]);

    group.truncate(1);
    assert_eq!(*log.lock().unwrap(), vec![0x200, 0x300, 0x400]);

    group.clear();
    assert_eq!(*log.lock().unwrap(), vec![0x200, 0x300, 0x400, 0x100]);
}

#[test]
fn test_moving_out_of_group_keeps_buffer_alive() {
    let (log, release) = recorder();

    let mut group: UniqueDevPtrs<u8, _> = vec![
        unsafe { UniqueDevPtr::from_raw_in(0x500 as *mut u8, Ownership::Owned, release.clone()) },
        unsafe { UniqueDevPtr::from_raw_in(0x600 as *mut u8, Ownership::Owned, release) },
    ];

    let kept = group[0].take();
    drop(group);
    assert_eq!(*log.lock().unwrap(), vec![0x600]);

    drop(kept);
    assert_eq!(*log.lock().unwrap(), vec![0x600, 0x500]);
}
