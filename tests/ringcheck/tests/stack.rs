//! Boundary-layer checks: the smoltcp adapter over a simulated core.

use smoltcp::phy::{Device, RxToken, TxToken};
use smoltcp::time::Instant;

use axieth::stack::{self, DeviceAdapter, MAX_FRAME_SIZE};
use ringcheck::{fresh_core, patterned_frame};

#[test]
fn adapter_reports_ethernet_mtu() {
    let (_sim, core) = fresh_core();
    let adapter = DeviceAdapter::new(core);
    let caps = adapter.capabilities();
    assert_eq!(caps.max_transmission_unit, MAX_FRAME_SIZE);
}

#[test]
fn adapter_transmit_reaches_the_ring() {
    let (sim, core) = fresh_core();
    sim.set_auto_drain(true);
    let mut adapter = DeviceAdapter::new(core);

    let frame = patterned_frame(60, 0x10);
    let token = adapter
        .transmit(Instant::from_millis(0))
        .expect("ring has room");
    token.consume(frame.len(), |buf| buf.copy_from_slice(&frame));

    assert_eq!(sim.transmitted(), vec![frame]);
    assert!(stack::tx_packet_count() >= 1);
}

#[test]
fn adapter_receive_yields_injected_frame() {
    let (sim, core) = fresh_core();
    let mut adapter = DeviceAdapter::new(core);

    let frame = patterned_frame(46, 0x20);
    sim.inject_rx_frame(&frame);

    let (rx, _tx) = adapter
        .receive(Instant::from_millis(0))
        .expect("frame is pending");
    rx.consume(|buf| {
        assert_eq!(buf, &frame[..]);
    });
}

#[test]
fn adapter_receive_empty_is_none() {
    let (_sim, core) = fresh_core();
    let mut adapter = DeviceAdapter::new(core);
    assert!(adapter.receive(Instant::from_millis(0)).is_none());
}

#[test]
fn adapter_shutdown_path_releases_core() {
    let (sim, core) = fresh_core();
    let adapter = DeviceAdapter::new(core);

    let core = adapter.into_inner();
    core.cancel_receive();
    core.exit();
    assert!(sim.counters().balanced());
}
