// Benchmark for serial framing and the Z-Wave receive path
// Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use mesh_gateway::codec::{DataFrame, Decoded, EnOceanCodec, FrameCodec, Packet, ZWaveCodec};
use mesh_gateway::zwave::{function, ZWaveNetwork, ZWaveProtocol};
use mesh_gateway::zwave::network::CONTROLLER_ID;
use mesh_gateway::network::Network;

fn decode_all<C: FrameCodec>(codec: &C, mut buf: &[u8]) -> usize {
    let mut frames = 0;
    loop {
        let step = codec.decode(buf);
        if matches!(step, Decoded::NeedMore) {
            return frames;
        }
        if matches!(step, Decoded::Frame(..)) {
            frames += 1;
        }
        buf = &buf[step.consumed()..];
    }
}

fn application_command(node: u8, value: u8) -> DataFrame {
    DataFrame::request(function::APPLICATION_COMMAND_HANDLER, vec![0x00, node, 3, 0x20, 0x03, value])
}

fn bench_zwave_decode(c: &mut Criterion) {
    let mut stream = Vec::new();
    for i in 0..10_000u32 {
        stream.extend(ZWaveCodec.encode(&application_command(2, (i % 100) as u8)).unwrap());
        stream.push(0x06);
    }
    c.bench_function("decode 10k Z-Wave frames", |b| {
        b.iter(|| assert_eq!(decode_all(&ZWaveCodec, &stream), 10_000));
    });
}

fn bench_enocean_decode(c: &mut Criterion) {
    let mut stream = Vec::new();
    for i in 0..10_000u32 {
        let data = vec![0xf6, 0x30, 0x01, 0x02, 0x03, (i % 256) as u8, 0x30];
        let optional = vec![0x01, 0xff, 0xff, 0xff, 0xff, 0x40, 0x00];
        stream.extend(EnOceanCodec.encode(&Packet::new(0x01, data, optional)).unwrap());
    }
    c.bench_function("decode 10k EnOcean packets", |b| {
        b.iter(|| assert_eq!(decode_all(&EnOceanCodec, &stream), 10_000));
    });
}

fn bench_zwave_receive(c: &mut Criterion) {
    let mut stream = Vec::new();
    for i in 0..1_000u32 {
        stream.extend(ZWaveCodec.encode(&application_command(2, (i % 2) as u8 * 0xff)).unwrap());
    }
    c.bench_function("dispatch 1k application commands", |b| {
        b.iter(|| {
            let mut network = ZWaveNetwork::new(ZWaveProtocol::default(), CONTROLLER_ID);
            network.receive(&stream);
            assert!(network.take_output().len() >= 1_000);
        });
    });
}

criterion_group!(benches, bench_zwave_decode, bench_enocean_decode, bench_zwave_receive);
criterion_main!(benches);
