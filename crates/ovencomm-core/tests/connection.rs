use ovencomm_core::protocol::{
    Command, ConnectionSettings, DispatchState, EventReceiver, LineFault, OvenConnection,
    OvenEvent, PortConfig, ProtocolError, Transport, TransportError,
};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

/// Mock link that records every write and replays queued input
#[derive(Default)]
struct MockLink {
    open: bool,
    sent: Vec<Vec<u8>>,
    inbound: Vec<u8>,
    read_fault: Option<TransportError>,
    refuse_open: bool,
}

impl MockLink {
    fn reply(&mut self, bytes: &[u8]) {
        self.inbound.extend_from_slice(bytes);
    }
}

impl Transport for MockLink {
    fn open(&mut self, _config: &PortConfig) -> Result<(), TransportError> {
        if self.refuse_open {
            return Err(TransportError::fault(LineFault::NotFound, "no such device"));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        if let Some(fault) = self.read_fault.take() {
            return Err(fault);
        }
        Ok(std::mem::take(&mut self.inbound))
    }
}

fn connect() -> (OvenConnection<MockLink>, EventReceiver) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (mut conn, rx) = OvenConnection::new(MockLink::default(), ConnectionSettings::default());
    conn.open(&PortConfig::new("/dev/ttyUSB0", 9600)).unwrap();
    (conn, rx)
}

fn drain(rx: &mut EventReceiver) -> Vec<OvenEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn test_set_temperature_round_trip() {
    let (mut conn, mut rx) = connect();
    let now = Instant::now();

    conn.set_temperature(40.0);
    assert!(conn.transport().sent.is_empty());

    conn.service(now);
    assert_eq!(conn.transport().sent, vec![b"*600fa08d\r".to_vec()]);
    assert_eq!(conn.state(), DispatchState::AwaitingResponse);

    conn.transport_mut().reply(b"*0fa027^");
    conn.service(now);

    assert_eq!(
        drain(&mut rx),
        vec![
            OvenEvent::RawFrame(b"*0fa027^".to_vec()),
            OvenEvent::Value {
                value: 4000,
                command: Command::SetTemp
            },
        ]
    );
    assert_eq!(conn.pending(), 0);
    assert_eq!(conn.state(), DispatchState::Idle);
}

#[test]
fn test_request_while_closed() {
    let (mut conn, mut rx) =
        OvenConnection::new(MockLink::default(), ConnectionSettings::default());

    conn.read_output();
    conn.service(Instant::now());

    assert_eq!(
        drain(&mut rx),
        vec![OvenEvent::Error {
            error: ProtocolError::NotOpen,
            command: Command::GetOutput
        }]
    );
    assert_eq!(conn.pending(), 0);
    assert!(conn.transport().sent.is_empty());
}

#[test]
fn test_open_failure_is_reported() {
    let link = MockLink {
        refuse_open: true,
        ..Default::default()
    };
    let (mut conn, _rx) = OvenConnection::new(link, ConnectionSettings::default());

    let err = conn.open(&PortConfig::new("/dev/ttyUSB9", 9600)).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::TransportFault {
            fault: LineFault::NotFound,
            message: "no such device".to_string()
        }
    );
    assert!(!conn.is_open());
    assert!(conn.port_config().is_none());
}

#[test]
fn test_checksum_mismatch_drops_one_request() {
    let (mut conn, mut rx) = connect();
    let now = Instant::now();

    conn.read_temperature();
    conn.read_output();
    conn.service(now);

    conn.transport_mut().reply(b"*01f4fa^");
    conn.service(now);

    assert_eq!(
        drain(&mut rx),
        vec![
            OvenEvent::RawFrame(b"*01f4fa^".to_vec()),
            OvenEvent::Error {
                error: ProtocolError::ChecksumMismatch {
                    expected: 0xfb,
                    actual: 0xfa
                },
                command: Command::GetTemp
            },
        ]
    );
    assert_eq!(conn.pending(), 1);
    // The next request goes out on the same tick
    assert_eq!(
        conn.transport().sent,
        vec![b"*01000021\r".to_vec(), b"*03000023\r".to_vec()]
    );
}

#[test]
fn test_timeout_drops_head() {
    let (mut conn, mut rx) = connect();
    let start = Instant::now();

    conn.read_power_status();
    conn.read_sensor_status();
    conn.service(start);

    conn.service(start + Duration::from_millis(999));
    assert!(drain(&mut rx).is_empty());

    conn.service(start + Duration::from_millis(1000));
    assert_eq!(
        drain(&mut rx),
        vec![OvenEvent::Error {
            error: ProtocolError::ResponseTimeout {
                timeout_ms: 1000,
                received: 0
            },
            command: Command::GetPowerStatus
        }]
    );
    assert_eq!(conn.pending(), 1);
    assert_eq!(conn.transport().sent.len(), 2);
}

#[test]
fn test_partial_response_times_out() {
    let (mut conn, mut rx) = connect();
    let start = Instant::now();

    conn.read_set_temperature();
    conn.service(start);
    conn.transport_mut().reply(b"*0fa");
    conn.service(start + Duration::from_millis(500));

    conn.service(start + Duration::from_millis(1000));
    assert_eq!(
        drain(&mut rx),
        vec![OvenEvent::Error {
            error: ProtocolError::ResponseTimeout {
                timeout_ms: 1000,
                received: 4
            },
            command: Command::GetSetTemp
        }]
    );
}

#[test]
fn test_malformed_response_waits_for_timeout() {
    let (mut conn, mut rx) = connect();
    let start = Instant::now();

    conn.read_temperature();
    conn.service(start);
    conn.transport_mut().reply(b"*01f4fb^\r");
    conn.service(start);

    assert!(drain(&mut rx).is_empty());
    assert_eq!(conn.state(), DispatchState::AwaitingResponse);

    conn.service(start + Duration::from_secs(1));
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [OvenEvent::Error {
            error: ProtocolError::ResponseTimeout { received: 9, .. },
            command: Command::GetTemp
        }]
    ));
}

#[test]
fn test_one_request_in_flight_under_burst() {
    let (mut conn, _rx) = connect();
    let now = Instant::now();

    for _ in 0..5 {
        conn.read_temperature();
        conn.read_output();
    }
    for i in 0..20 {
        conn.service(now + Duration::from_millis(i * 10));
    }

    assert_eq!(conn.transport().sent.len(), 1);
    assert_eq!(conn.pending(), 10);
}

#[test]
fn test_responses_match_queue_order() {
    let (mut conn, mut rx) = connect();
    let now = Instant::now();

    conn.read_temperature();
    conn.read_output();
    conn.set_power_status(true);

    conn.service(now);
    conn.transport_mut().reply(b"*01f4fb^");
    conn.service(now);
    conn.transport_mut().reply(b"*3840cf^");
    conn.service(now);
    conn.transport_mut().reply(b"*0001c1^");
    conn.service(now);

    let values: Vec<(Command, u16)> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            OvenEvent::Value { value, command } => Some((command, value)),
            _ => None,
        })
        .collect();
    assert_eq!(
        values,
        vec![
            (Command::GetTemp, 500),
            (Command::GetOutput, 0x3840),
            (Command::SetPowerStatus, 1),
        ]
    );
    assert_eq!(conn.transport().sent[2], b"*6500012c\r".to_vec());
}

#[test]
fn test_unsolicited_response_is_ignored() {
    let (mut conn, mut rx) = connect();
    conn.transport_mut().reply(b"*01f4fb^");
    conn.service(Instant::now());

    assert!(drain(&mut rx).is_empty());
    assert_eq!(conn.state(), DispatchState::Idle);
}

#[test]
fn test_fatal_fault_disconnects() {
    let (mut conn, mut rx) = connect();
    let now = Instant::now();

    conn.read_temperature();
    conn.read_output();
    conn.read_power_status();
    conn.service(now);

    conn.transport_mut().read_fault = Some(TransportError::fault(
        LineFault::Resource,
        "device unplugged",
    ));
    conn.service(now);

    assert_eq!(
        drain(&mut rx),
        vec![
            OvenEvent::Error {
                error: ProtocolError::TransportFault {
                    fault: LineFault::Resource,
                    message: "device unplugged".to_string()
                },
                command: Command::GetTemp
            },
            OvenEvent::Disconnected {
                reason: "device unplugged".to_string()
            },
        ]
    );
    assert!(!conn.is_open());
    assert_eq!(conn.pending(), 0);
}

#[test]
fn test_recoverable_fault_keeps_link() {
    let (mut conn, mut rx) = connect();
    let now = Instant::now();

    conn.read_temperature();
    conn.read_output();
    conn.service(now);

    conn.handle_line_fault(LineFault::Parity, "parity error");

    assert!(matches!(
        drain(&mut rx).as_slice(),
        [OvenEvent::Error {
            error: ProtocolError::TransportFault {
                fault: LineFault::Parity,
                ..
            },
            command: Command::GetTemp
        }]
    ));
    assert!(conn.is_open());
    assert_eq!(conn.pending(), 1);

    conn.service(now);
    assert_eq!(conn.transport().sent.len(), 2);
}

#[test]
fn test_fault_with_empty_queue_is_untagged() {
    let (mut conn, mut rx) = connect();
    conn.handle_line_fault(LineFault::Framing, "framing error");

    assert!(matches!(
        drain(&mut rx).as_slice(),
        [OvenEvent::Error {
            command: Command::None,
            ..
        }]
    ));
}

#[test]
fn test_invalid_temperature_is_rejected() {
    let (mut conn, mut rx) = connect();

    conn.set_temperature(f64::NAN);
    conn.set_temperature(500.0);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    for event in events {
        match event {
            OvenEvent::Error { error, command } => {
                assert!(matches!(error, ProtocolError::InvalidPayload(_)));
                assert_eq!(command, Command::SetTemp);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(conn.pending(), 0);
}

#[test]
fn test_close_discards_pending_requests() {
    let (mut conn, mut rx) = connect();
    let now = Instant::now();

    conn.read_temperature();
    conn.read_output();
    conn.service(now);
    conn.close();

    assert!(!conn.is_open());
    assert_eq!(conn.pending(), 0);
    assert_eq!(conn.state(), DispatchState::Idle);
    assert!(drain(&mut rx).is_empty());

    conn.open(&PortConfig::new("/dev/ttyUSB0", 9600)).unwrap();
    conn.read_sensor_status();
    conn.service(now);
    assert_eq!(conn.transport().sent.last().unwrap(), b"*04000024\r");
}
