//! Benchmarks for handle construction and teardown.

use std::ptr::NonNull;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use unique_devptr::gpu::host::HostDevice;
use unique_devptr::{DevPtrSliceExt, Ownership, ReleaseFn, UniqueDevPtr, UniqueDevPtrs};

fn bench_owned_drop(c: &mut Criterion) {
    let release = ReleaseFn(|p: NonNull<u8>| {
        black_box(p);
    });

    c.bench_function("owned_handle_construct_drop", |b| {
        b.iter(|| {
            let h = unsafe {
                UniqueDevPtr::from_raw_in(black_box(0x1000 as *mut f32), Ownership::Owned, release)
            };
            drop(h);
        })
    });

    c.bench_function("fake_handle_construct_drop", |b| {
        b.iter(|| {
            let h = UniqueDevPtr::fake_in(black_box(0x1000 as *mut f32), release);
            drop(h);
        })
    });
}

fn bench_host_alloc(c: &mut Criterion) {
    let dev = HostDevice::new();

    c.bench_function("host_alloc_release_64kb", |b| {
        b.iter(|| {
            let buf = UniqueDevPtr::<f32, _>::alloc_in(16 * 1024, dev.clone()).unwrap();
            black_box(buf.as_ptr());
        })
    });
}

fn bench_group_teardown(c: &mut Criterion) {
    let dev = HostDevice::new();

    c.bench_function("group_alloc_release_64", |b| {
        b.iter(|| {
            let group: UniqueDevPtrs<f32, _> = (0..64)
                .map(|_| UniqueDevPtr::alloc_in(256, dev.clone()).unwrap())
                .collect();
            black_box(group.raw_ptrs());
        })
    });
}

criterion_group!(benches, bench_owned_drop, bench_host_alloc, bench_group_teardown);
criterion_main!(benches);
