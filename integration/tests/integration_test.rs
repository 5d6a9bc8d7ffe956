//! End-to-end tests against a fake Solarman data logger on loopback

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use deye_exporter::config::{ExporterSettings, InverterSettings};
use deye_exporter::*;
use solarman::*;

const SERIAL: u32 = 2_999_999_999;
const CRC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_MODBUS);

/// Answers read holding register requests the way a Solarman stick does
#[derive(Clone)]
struct FakeLogger {
    serial: u32,
    registers: Arc<HashMap<u16, u16>>,
    // close the connection after this many responses
    responses_per_connection: Option<usize>,
    connections: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
}

impl FakeLogger {
    fn new(registers: &[(u16, u16)]) -> Self {
        Self {
            serial: SERIAL,
            registers: Arc::new(registers.iter().copied().collect()),
            responses_per_connection: None,
            connections: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_serial(mut self, serial: u32) -> Self {
        self.serial = serial;
        self
    }

    fn closing_after(mut self, responses: usize) -> Self {
        self.responses_per_connection = Some(responses);
        self
    }

    async fn spawn(self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(x) => x,
                    Err(_) => return,
                };
                self.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(self.clone().serve(stream));
            }
        });
        addr
    }

    async fn serve(self, mut stream: TcpStream) {
        let mut answered = 0;
        loop {
            if let Some(max) = self.responses_per_connection {
                if answered >= max {
                    return;
                }
            }

            let mut header = [0u8; 11];
            if stream.read_exact(&mut header).await.is_err() {
                return;
            }
            let length = u16::from_le_bytes([header[1], header[2]]) as usize;
            let mut rest = vec![0u8; length + 2];
            if stream.read_exact(&mut rest).await.is_err() {
                return;
            }
            self.requests.fetch_add(1, Ordering::SeqCst);

            // payload: 15 byte request prefix followed by the RTU frame
            let rtu = &rest[15..length];
            let slave = rtu[0];
            let start = u16::from_be_bytes([rtu[2], rtu[3]]);
            let count = u16::from_be_bytes([rtu[4], rtu[5]]);

            let response = self.response(header[5], slave, start, count);
            if stream.write_all(&response).await.is_err() {
                return;
            }
            answered += 1;
        }
    }

    fn response(&self, sequence: u8, slave: u8, start: u16, count: u16) -> Vec<u8> {
        let mut rtu = vec![slave, 0x03, (count * 2) as u8];
        for address in start..start + count {
            let value = self.registers.get(&address).copied().unwrap_or(0);
            rtu.extend_from_slice(&value.to_be_bytes());
        }
        let crc = CRC.checksum(&rtu);
        rtu.extend_from_slice(&crc.to_le_bytes());

        let mut payload = vec![0x02, 0x01];
        payload.extend_from_slice(&[0; 12]);
        payload.extend_from_slice(&rtu);

        let mut frame = vec![0xA5];
        frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        frame.extend_from_slice(&0x1510u16.to_le_bytes());
        frame.extend_from_slice(&[sequence, 0x42]);
        frame.extend_from_slice(&self.serial.to_le_bytes());
        frame.extend_from_slice(&payload);
        let checksum = frame[1..].iter().fold(0u8, |acc, x| acc.wrapping_add(*x));
        frame.push(checksum);
        frame.push(0x15);
        frame
    }
}

fn options() -> ClientOptions {
    ClientOptions::default().timeout(Duration::from_secs(2))
}

async fn connect(addr: SocketAddr) -> Client {
    Client::connect(
        &addr.ip().to_string(),
        addr.port(),
        LoggerSerial::new(SERIAL),
        options(),
    )
    .await
    .unwrap()
}

fn range(start: u16, count: u16) -> AddressRange {
    AddressRange::try_from(start, count).unwrap()
}

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|x| x.to_string()).collect()
}

#[tokio::test]
async fn client_reads_holding_registers() {
    let addr = FakeLogger::new(&[(183, 5230), (184, 87)]).spawn().await;
    let mut client = connect(addr).await;

    assert_eq!(
        client.read_holding_registers(range(183, 2)).await.unwrap(),
        vec![5230, 87]
    );
    assert_eq!(
        client.read_holding_registers(range(182, 4)).await.unwrap(),
        vec![0, 5230, 87, 0]
    );
    assert!(client.is_connected());
}

#[tokio::test]
async fn client_reconnects_after_logger_closes_connection() {
    let logger = FakeLogger::new(&[(184, 87)]).closing_after(1);
    let connections = logger.connections.clone();
    let addr = logger.spawn().await;
    let mut client = connect(addr).await;

    assert_eq!(
        client.read_holding_registers(range(184, 1)).await.unwrap(),
        vec![87]
    );

    // the logger hung up, this read fails and drops the connection
    assert!(client.read_holding_registers(range(184, 1)).await.is_err());
    assert!(!client.is_connected());

    assert_eq!(
        client.read_holding_registers(range(184, 1)).await.unwrap(),
        vec![87]
    );
    assert_eq!(connections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_rejects_responses_from_another_logger() {
    let addr = FakeLogger::new(&[]).with_serial(1234).spawn().await;
    let mut client = connect(addr).await;

    assert_eq!(
        client.read_holding_registers(range(0, 1)).await,
        Err(RequestError::BadFrame(FrameParseError::LoggerSerialMismatch(
            SERIAL, 1234
        )))
    );
}

#[tokio::test]
async fn client_times_out_on_silent_logger() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // accept and hold the connection without ever answering
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let mut client = Client::connect(
        &addr.ip().to_string(),
        addr.port(),
        LoggerSerial::new(SERIAL),
        ClientOptions::default().timeout(Duration::from_millis(200)),
    )
    .await
    .unwrap();

    assert_eq!(
        client.read_holding_registers(range(0, 1)).await,
        Err(RequestError::ResponseTimeout)
    );
    assert!(!client.is_connected());
}

#[tokio::test]
async fn collects_and_renders_prometheus_metrics() {
    let addr = FakeLogger::new(&[
        (59, 2),      // running state: normal
        (169, 65336), // grid power: -200 W
        (183, 5230),  // battery voltage: 52.3 V
        (184, 87),    // battery SOC: 87 %
    ])
    .spawn()
    .await;
    let client = connect(addr).await;

    let catalog = DeyeCatalog::new();
    let configured = names(&["BatterySOC", "BatteryVoltage", "RunState", "GridPower"]);
    let registry = prometheus::Registry::new();
    let mut sink = PrometheusSink::new(registry.clone());
    let metrics = build_registry(&configured, &catalog, &mut sink).unwrap();

    let mut collector = Collector::new(client, catalog, metrics, configured);
    let report = collector.collect_once().await;

    assert!(report.is_complete(), "{report}");
    assert_eq!(report.numeric_updates, 3);
    assert_eq!(report.text_updates, 1);

    let output = server::render(&registry).unwrap();
    assert!(output.contains("deye_battery_state_of_charge 87"), "{output}");
    assert!(output.contains("deye_battery_voltage 52.3"), "{output}");
    assert!(output.contains("deye_grid_power -200"), "{output}");
    assert!(
        output.contains("deye_running_state_info{value=\"Normal\"} 1"),
        "{output}"
    );
    assert!(output.contains("# HELP deye_battery_voltage Battery Voltage (V)"));
}

#[tokio::test]
async fn failed_batches_do_not_stop_later_cycles() {
    let logger = FakeLogger::new(&[(184, 87)]).closing_after(1);
    let addr = logger.clone().spawn().await;
    let client = connect(addr).await;

    let catalog = DeyeCatalog::new();
    let configured = names(&["BatterySOC"]);
    let registry = prometheus::Registry::new();
    let metrics = build_registry(
        &configured,
        &catalog,
        &mut PrometheusSink::new(registry.clone()),
    )
    .unwrap();
    let mut collector = Collector::new(client, catalog, metrics, configured);

    assert!(collector.collect_once().await.is_complete());

    let report = collector.collect_once().await;
    assert_eq!(report.batches_failed, 1);
    assert_eq!(report.numeric_updates, 0);

    assert!(collector.collect_once().await.is_complete());
    assert_eq!(logger.connections.load(Ordering::SeqCst), 2);
    assert!(server::render(&registry)
        .unwrap()
        .contains("deye_battery_state_of_charge 87"));
}

fn settings(addr: SocketAddr) -> Settings {
    Settings {
        exporter: ExporterSettings {
            port: 0,
            collection_interval: Duration::from_secs(1),
        },
        inverter: InverterSettings {
            host: addr.ip().to_string(),
            port: addr.port(),
            serial_number: SERIAL,
            slave_id: 1,
            timeout: Duration::from_secs(2),
            decode: DecodeLevel::nothing(),
        },
        metrics: names(&["BatterySOC", "RunState"]),
    }
}

#[tokio::test]
async fn exporter_runs_until_cancelled() {
    let logger = FakeLogger::new(&[(59, 2), (184, 87)]);
    let requests = logger.requests.clone();
    let addr = logger.spawn().await;

    let shutdown = CancellationToken::new();
    let exporter = tokio::spawn(run_until(settings(addr), shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.cancel();

    exporter.await.unwrap().unwrap();
    assert!(requests.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn exporter_fails_to_start_without_logger() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = run_until(settings(addr), CancellationToken::new()).await;
    assert!(matches!(result, Err(StartupError::Connect { .. })));
}

#[tokio::test]
async fn exporter_starts_with_unknown_register_names() {
    let addr = FakeLogger::new(&[]).spawn().await;
    let mut settings = settings(addr);
    settings.metrics = names(&["NoSuchRegister"]);

    // unknown names are skipped, startup still succeeds
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    run_until(settings, shutdown).await.unwrap();
}
