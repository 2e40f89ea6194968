// Reads and adjusts a simulated DS1307 through the full stack.

use nixie_rtc::datetime::{ClockValue, Meridiem};
use nixie_rtc::device::RegisterClient;
use nixie_rtc::rtc::{Ds1307, Register, SqwPinMode};
use nixie_rtc::twi::sim::{BusEvent, SimulatedBus};
use nixie_rtc::twi::{Error, Phase, Timeout, Twi};

#[test]
fn read_preloaded_registers() {
    let mut bus = SimulatedBus::new();
    // 23:59:45 on Saturday 2099-12-31, 24-hour mode, oscillator running.
    bus.load(0x00, &[0x45, 0x59, 0x23, 0x07, 0x31, 0x12, 0x99]);

    let mut rtc = Ds1307::new(Twi::new(bus));
    let now = rtc.now().unwrap();

    assert_eq!(now, ClockValue::new(2099, 12, 31, 23, 59, 45));
    assert!(!now.is_12_hour());
}

#[test]
fn read_preloaded_12h_registers() {
    let mut bus = SimulatedBus::new();
    // 11:30:05 PM on 2017-07-04, 12-hour mode.
    bus.load(0x00, &[0x05, 0x30, 0x71, 0x02, 0x04, 0x07, 0x17]);

    let mut rtc = Ds1307::new(Twi::new(bus));

    assert_eq!(
        rtc.now().unwrap(),
        ClockValue::new_12h(2017, 7, 4, 11, 30, 5, Meridiem::Pm)
    );
}

#[test]
fn provision_from_build_time() {
    let mut rtc = Ds1307::new(Twi::new(SimulatedBus::new()));
    let seed = ClockValue::from_build_strings("Feb 13 2017", "18:14:10", true).unwrap();

    rtc.init().unwrap();
    rtc.adjust(&seed).unwrap();
    rtc.set_square_wave(SqwPinMode::SquareWave1Hz).unwrap();

    let bus = rtc.into_inner().into_inner().into_inner();
    assert_eq!(
        &bus.memory()[..8],
        &[0x10, 0x14, 0x66, 0x00, 0x13, 0x02, 0x17, 0x10]
    );
}

#[test]
fn one_transaction_per_register() {
    let mut rtc = Ds1307::new(Twi::new(SimulatedBus::new()));

    rtc.now().unwrap();

    let bus = rtc.client().twi().registers();
    let starts = bus
        .events()
        .iter()
        .filter(|&&event| event == BusEvent::Start)
        .count();
    let stops = bus
        .events()
        .iter()
        .filter(|&&event| event == BusEvent::Stop)
        .count();

    // Six timekeeping registers, day-of-week is skipped.
    assert_eq!(starts, 6);
    assert_eq!(stops, 6);
}

#[test]
fn reads_are_idempotent() {
    let mut bus = SimulatedBus::new();
    bus.load(Register::HOURS, &[0x52]);

    let mut client = RegisterClient::new(Twi::new(bus), 0x68);

    assert_eq!(client.read_register(Register::HOURS).unwrap(), 0x52);
    assert_eq!(client.read_register(Register::HOURS).unwrap(), 0x52);
}

#[test]
fn hung_bus_times_out() {
    let mut bus = SimulatedBus::new();
    bus.set_stuck(true);

    let mut twi = Twi::new(bus);
    twi.set_timeout(Timeout::Polls(1_000));

    let mut rtc = Ds1307::new(twi);

    match rtc.now() {
        Err(Error::Timeout(phase)) => assert_eq!(phase, Phase::Start),
        other => panic!("unexpected result: {:?}", other),
    }
}
