//! Transmit path benchmarks

use core::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{Criterion, criterion_group, criterion_main};

use nos_wlan_api::{FlowKey, HwTxTarget, Milliseconds, PacketBuffer, PauseReason, Rejected, TxClock};
use nos_wlan_txrx::{
    HostTxInfo, PhysicalDevice, StatsEvictionPolicy, StatsRingPool, TxConfig, VdevConfig,
};

struct SinkRadio;

impl HwTxTarget for SinkRadio {
    fn submit(&self, buf: PacketBuffer) -> Result<(), Rejected> {
        black_box(buf);
        Ok(())
    }

    fn free_descriptor_count(&self) -> u32 {
        1024
    }
}

#[derive(Default)]
struct TickClock(AtomicU64);

impl TxClock for TickClock {
    fn now_ms(&self) -> Milliseconds {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

fn device(config: TxConfig, vdevs: u8) -> PhysicalDevice {
    let dev = PhysicalDevice::with_default_classifier(
        config,
        Arc::new(SinkRadio),
        Arc::new(TickClock::default()),
    )
    .unwrap();
    for id in 0..vdevs {
        dev.attach_vdev(id, VdevConfig::default()).unwrap();
    }
    dev
}

fn pure_ack(id: u32, ack: u32) -> PacketBuffer {
    let flow = FlowKey::new(0x0a00_0001, 0x0a00_0002, 40000 + (id % 8) as u16, 80);
    let mut frame = vec![0u8; 54];
    frame[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
    frame[14] = 0x45;
    frame[16..18].copy_from_slice(&40u16.to_be_bytes());
    frame[23] = 6;
    frame[26..30].copy_from_slice(&flow.src_ip.to_be_bytes());
    frame[30..34].copy_from_slice(&flow.dst_ip.to_be_bytes());
    frame[34..36].copy_from_slice(&flow.src_port.to_be_bytes());
    frame[36..38].copy_from_slice(&flow.dst_port.to_be_bytes());
    frame[42..46].copy_from_slice(&ack.to_be_bytes());
    frame[46] = 5 << 4;
    frame[47] = 0x10;
    PacketBuffer::new(id, frame)
}

fn bench_direct_submit(c: &mut Criterion) {
    let dev = device(TxConfig::default(), 1);
    let mut id = 0u32;
    c.bench_function("submit_direct", |b| {
        b.iter(|| {
            id = id.wrapping_add(1);
            black_box(dev.submit(0, PacketBuffer::new(id, vec![0u8; 1500])).unwrap());
        });
    });
}

fn bench_drain_pass(c: &mut Criterion) {
    let config = TxConfig {
        tx_budget_per_pass: 256,
        ..TxConfig::default()
    };
    let dev = device(config, 4);
    c.bench_function("drain_pass_4x64", |b| {
        b.iter(|| {
            dev.pause_all(PauseReason::FW);
            for vdev in 0..4u8 {
                let frames = (0..64).map(|n| PacketBuffer::new(n, vec![0u8; 256])).collect();
                dev.submit_list(vdev, frames).unwrap();
            }
            dev.resume_all(PauseReason::FW);
            black_box(dev.schedule());
        });
    });
}

fn bench_ack_coalescing(c: &mut Criterion) {
    let config = TxConfig {
        coalescing_enabled: true,
        ..TxConfig::default()
    };
    let dev = device(config, 1);
    let mut ack = 0u32;
    c.bench_function("ack_coalescing_8_streams", |b| {
        b.iter(|| {
            ack = ack.wrapping_add(1);
            black_box(dev.submit(0, pure_ack(ack, ack)).unwrap());
        });
    });
}

fn bench_stats_ring(c: &mut Criterion) {
    let pool = StatsRingPool::new(32, StatsEvictionPolicy::default());
    let mut id = 0u32;
    c.bench_function("stats_ring_cycle", |b| {
        b.iter(|| {
            id = id.wrapping_add(1);
            pool.acquire_for_host(id, HostTxInfo::default()).unwrap();
            pool.complete_with_device(id, 10);
            black_box(pool.consume());
        });
    });
}

criterion_group!(
    txrx_benchmarks,
    bench_direct_submit,
    bench_drain_pass,
    bench_ack_coalescing,
    bench_stats_ring
);

criterion_main!(txrx_benchmarks);
