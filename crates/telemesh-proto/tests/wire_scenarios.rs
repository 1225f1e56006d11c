//! Concrete end-to-end wire scenarios with hand-checked byte layouts.

use telemesh_proto::{
    CodecError, Encoder, MeshPacket, Packet,
    field::{Battery, Datetime, Environment, Flags},
    mesh::MeshControl,
    tlv::TlvValue,
};

/// Battery + environment on a weather station: 5 bytes of header and
/// presence plus 30 field bits lands on 9 bytes.
#[test]
fn battery_and_environment_round_trip() {
    let mut buf = [0u8; 32];
    let mut enc = Encoder::begin(&mut buf, 0, 42, 1).unwrap();
    enc.battery(Battery::new(75, false).unwrap()).unwrap();
    enc.environment(Environment::new_scaled(2150, 1013, 60).unwrap()).unwrap();
    let len = enc.end().unwrap();
    assert_eq!(len, 9);

    let packet = Packet::decode(&buf[..len]).unwrap();
    let battery = packet.fields.battery.unwrap();
    assert_eq!(battery.level_pct(), 75);
    assert!(!battery.charging());
    let env = packet.fields.environment.unwrap();
    assert_eq!(env.temperature_centi(), 2150);
    assert_eq!(env.pressure_hpa(), 1013);
    assert_eq!(env.humidity_pct(), 60);
}

/// Full wire image of the scenario above, bit by bit.
#[test]
fn battery_and_environment_exact_bytes() {
    let mut buf = [0u8; 32];
    let mut enc = Encoder::begin(&mut buf, 0, 42, 1).unwrap();
    enc.battery(Battery::new(75, false).unwrap()).unwrap();
    enc.environment(Environment::new_scaled(2150, 1013, 60).unwrap()).unwrap();
    let len = enc.end().unwrap();

    // header: variant 0, station 42, sequence 1
    // presence: 00101000 (battery, environment)
    // battery: level 15 (01111), charging 0
    // environment: temperature 246 (011110110), pressure 163 (10100011),
    // humidity 60 (0111100)
    // -> 011110 011110110 10100011 0111100 + 2 pad bits
    //    = 01111001 11101101 01000110 11110000
    assert_eq!(hex::encode(&buf[..len]), "002a00012879ed46f0");
}

/// TLV chain: raw, string, raw; `more` flags 1,1,0; re-encode is
/// byte-identical.
#[test]
fn tlv_chain_round_trip() {
    let mut buf = [0u8; 64];
    let mut enc = Encoder::begin(&mut buf, 0, 42, 2).unwrap();
    enc.tlv_raw(0x20, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
    enc.tlv_string(0x21, "HELLO").unwrap();
    enc.tlv_raw(0x22, &[0x5A]).unwrap();
    let len = enc.end().unwrap();

    let packet = Packet::decode(&buf[..len]).unwrap();
    assert_eq!(packet.tlvs.len(), 3);
    assert_eq!(packet.tlvs[0].ty, 0x20);
    assert_eq!(packet.tlvs[1].value, TlvValue::Text("HELLO".into()));
    assert_eq!(packet.tlvs[2].ty, 0x22);

    let mut out = [0u8; 64];
    let out_len = packet.reencode(&mut out).unwrap();
    assert_eq!(&out[..out_len], &buf[..len]);
}

/// Key/value TLV joins pairs with single spaces and rejects the
/// malformed shapes.
#[test]
fn tlv_key_value_helper() {
    let mut buf = [0u8; 64];
    let mut enc = Encoder::begin(&mut buf, 0, 42, 3).unwrap();
    enc.tlv_string_kv(0x23, &["fw", "104", "hw", "rev2"]).unwrap();
    let len = enc.end().unwrap();

    let packet = Packet::decode(&buf[..len]).unwrap();
    assert_eq!(packet.tlvs[0].value, TlvValue::Text("fw 104 hw rev2".into()));

    let mut enc = Encoder::begin(&mut buf, 0, 42, 4).unwrap();
    assert_eq!(enc.tlv_string_kv(0x23, &["odd"]).unwrap_err(), CodecError::TlvKeyValueCount);
    assert_eq!(enc.tlv_string_kv(0x23, &["k", ""]).unwrap_err(), CodecError::TlvKeyValueEmpty);
}

/// A field at position 11 forces the second presence byte: byte 0 has
/// ext set, byte 1 clears ext and carries the field bit.
#[test]
fn presence_extension_byte() {
    let mut buf = [0u8; 32];
    let mut enc = Encoder::begin(&mut buf, 6, 42, 5).unwrap();
    enc.datetime(Datetime::new(600).unwrap()).unwrap(); // diagnostic position 11
    let len = enc.end().unwrap();

    // 4 header + 2 presence + 20 bits datetime
    assert_eq!(len, 9);
    assert_eq!(buf[4], 0b1000_0000, "ext set, tlv clear, no fields in byte 0");
    // byte 1: ext=0, positions 6..12 -> datetime at position 11 is bit 1
    assert_eq!(buf[5], 0b0000_0010);

    let packet = Packet::decode(&buf[..len]).unwrap();
    assert_eq!(packet.fields.datetime.unwrap().seconds(), 600);
}

/// Twelve declared positions (diagnostic flags, position 12) still fit
/// two presence bytes.
#[test]
fn thirteen_positions_use_two_presence_bytes() {
    let mut buf = [0u8; 32];
    let mut enc = Encoder::begin(&mut buf, 6, 42, 6).unwrap();
    enc.flags(Flags(0xFF)).unwrap(); // position 12
    let len = enc.end().unwrap();
    assert_eq!(len, 4 + 2 + 1);
    assert_eq!(buf[5] & 0x80, 0, "second byte terminates the chain");
    assert_eq!(buf[5] & 0x01, 1, "position 12 is the lowest bit");
}

/// Station boundary behaviour: 0 is reserved, 4095 encodes.
#[test]
fn station_bounds() {
    let mut buf = [0u8; 16];
    assert_eq!(Encoder::begin(&mut buf, 0, 0, 0).unwrap_err(), CodecError::StationReserved);
    let enc = Encoder::begin(&mut buf, 0, 4095, 0).unwrap();
    let len = enc.end().unwrap();
    let packet = Packet::decode(&buf[..len]).unwrap();
    assert_eq!(packet.header.station, 4095);
}

/// Truncated decodes: too short for the header, and a 6-byte buffer
/// claiming a 9-byte beacon.
#[test]
fn truncated_decodes() {
    assert_eq!(
        Packet::decode(&[0x00, 0x2A, 0x00, 0x01]),
        Err(CodecError::DecodeShort { len: 4, needed: 5 })
    );

    let beacon = MeshPacket {
        sender: 100,
        sequence: 9,
        control: MeshControl::Beacon { gateway: 1, cost: 0, flags: 0, generation: 1 },
    };
    let wire = beacon.encode_to_vec().unwrap();
    assert_eq!(wire.len(), 9);
    assert!(matches!(MeshPacket::decode(&wire[..6]), Err(CodecError::Truncated { .. })));
}

/// Temperature range boundaries encode at the rails and error past
/// them.
#[test]
fn temperature_boundaries() {
    use telemesh_proto::field::Temperature;

    assert!(Temperature::new_scaled(-4000).is_ok());
    assert!(Temperature::new_scaled(8000).is_ok());
    assert_eq!(
        Temperature::new_scaled(-4025).unwrap_err(),
        CodecError::RangeLow { field: "temperature", value: -4025, min: -4000 }
    );
    assert_eq!(
        Temperature::new_scaled(8025).unwrap_err(),
        CodecError::RangeHigh { field: "temperature", value: 8025, max: 8000 }
    );
}
