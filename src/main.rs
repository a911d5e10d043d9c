//! devptr-probe: exercise owning and aliasing device handles end to end.
//!
//! Allocates a group of buffers on the configured backend, optionally
//! appends a non-owning alias, logs every borrowed address and releases the
//! whole group.

use clap::Parser;
use tracing::info;

use unique_devptr::config::{Backend, Cli, Config};
use unique_devptr::gpu::host::HostDevice;
use unique_devptr::{DevPtrSliceExt, DeviceAllocator, DeviceResult, UniqueDevPtr, UniqueDevPtrs};

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "unique_devptr=debug,devptr_probe=debug"
    } else {
        "unique_devptr=info,devptr_probe=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }

    info!("devptr-probe v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    config.merge_cli(&cli);
    let bytes_per_buffer = config.bytes_per_buffer()?;
    let total_bytes = config.total_bytes()?;

    info!(
        backend = ?config.device.backend,
        buffers = config.probe.buffers,
        bytes_per_buffer,
        total_bytes,
        "Configuration loaded"
    );

    match config.device.backend {
        Backend::Host => {
            let device = match config.device.host_capacity {
                Some(cap) => HostDevice::with_capacity(cap),
                None => HostDevice::new(),
            };
            let handles = run_probe(&config, device.clone())?;
            let stats = device.stats();
            info!(
                handles,
                allocations = stats.allocations,
                releases = stats.releases,
                live_bytes = stats.live_bytes,
                "Host backend statistics"
            );
        }
        Backend::Cuda => run_cuda(&config)?,
    }

    Ok(())
}

/// Allocate the probe group, log it and release it. Returns the group size.
fn run_probe<A: DeviceAllocator + Clone>(config: &Config, allocator: A) -> DeviceResult<usize> {
    let mut group: UniqueDevPtrs<f32, A> = Vec::new();
    for _ in 0..config.probe.buffers {
        group.push(UniqueDevPtr::alloc_in(
            config.probe.elements_per_buffer,
            allocator.clone(),
        )?);
    }

    if config.probe.alias_first {
        if let Some(first) = group.first() {
            let alias = UniqueDevPtr::fake_in(first.as_ptr(), allocator.clone());
            group.push(alias);
        }
    }

    for (index, (addr, handle)) in group.raw_ptrs().into_iter().zip(&group).enumerate() {
        info!(index, addr = ?addr, ownership = ?handle.ownership(), "Device buffer");
    }

    let handles = group.len();
    drop(group);
    info!(handles, "Released probe group");
    Ok(handles)
}

#[cfg(feature = "cuda")]
fn run_cuda(config: &Config) -> anyhow::Result<()> {
    use unique_devptr::gpu::cuda::{bind_device, CudaDevice};

    let _ctx = bind_device(config.device.ordinal)?;
    let handles = run_probe(config, CudaDevice)?;
    info!(handles, ordinal = config.device.ordinal, "CUDA probe finished");
    Ok(())
}

#[cfg(not(feature = "cuda"))]
fn run_cuda(config: &Config) -> anyhow::Result<()> {
    Err(unique_devptr::DeviceError::DeviceNotAvailable(config.device.ordinal).into())
}
