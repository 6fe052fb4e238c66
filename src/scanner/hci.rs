//! Raw HCI socket backend for SwitchBot Meter scanning.
//!
//! This backend uses raw Linux HCI sockets to scan for BLE advertisements
//! without requiring the BlueZ daemon. It requires CAP_NET_RAW and
//! CAP_NET_ADMIN capabilities or root privileges.

use super::{ADVERTISEMENT_CHANNEL_BUFFER_SIZE, ScanError};
use crate::decoder::{RawAdvertisement, uuid_from_u16};
use crate::mac_address::MacAddress;
use libc::{AF_BLUETOOTH, SOCK_CLOEXEC, SOCK_NONBLOCK, SOCK_RAW, c_int, c_void, sockaddr, socklen_t};
use std::collections::HashMap;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;

// HCI protocol constants
const BTPROTO_HCI: c_int = 1;
const SOL_HCI: c_int = 0;
const HCI_FILTER: c_int = 2;
const HCI_CHANNEL_RAW: u16 = 0;

const HCI_COMMAND_PKT: u8 = 0x01;
const HCI_EVENT_PKT: u8 = 0x04;
const EVT_LE_META_EVENT: u8 = 0x3E;
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

const OGF_LE_CTL: u16 = 0x08;
const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// Service data AD types
const AD_TYPE_SERVICE_DATA_UUID16: u8 = 0x16;
const AD_TYPE_SERVICE_DATA_UUID128: u8 = 0x21;

/// Largest HCI event: header plus 255 parameter bytes.
const HCI_MAX_EVENT_SIZE: usize = 260;

/// HCI socket address structure
#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

/// HCI filter structure for raw sockets
#[repr(C)]
#[derive(Default)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    fn le_meta_events() -> Self {
        let mut filter = Self::default();
        filter.type_mask |= 1 << u32::from(HCI_EVENT_PKT);
        let bit = usize::from(EVT_LE_META_EVENT);
        filter.event_mask[bit / 32] |= 1 << (bit % 32);
        filter
    }
}

fn last_os_error(what: &str) -> ScanError {
    ScanError::Bluetooth(format!("{what}: {}", io::Error::last_os_error()))
}

/// A raw HCI socket bound to one controller.
struct HciSocket {
    fd: OwnedFd,
}

impl HciSocket {
    fn open(dev_id: u16) -> Result<Self, ScanError> {
        // SOCK_NONBLOCK is required for AsyncFd
        let raw = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                SOCK_RAW | SOCK_CLOEXEC | SOCK_NONBLOCK,
                BTPROTO_HCI,
            )
        };
        if raw < 0 {
            return Err(last_os_error("Failed to create HCI socket"));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as u16,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW,
        };
        let ret = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &addr as *const SockaddrHci as *const sockaddr,
                mem::size_of::<SockaddrHci>() as socklen_t,
            )
        };
        if ret < 0 {
            return Err(last_os_error("Failed to bind HCI socket"));
        }

        Ok(Self { fd })
    }

    fn set_filter(&self, filter: &HciFilter) -> Result<(), ScanError> {
        let ret = unsafe {
            libc::setsockopt(
                self.fd.as_raw_fd(),
                SOL_HCI,
                HCI_FILTER,
                filter as *const HciFilter as *const c_void,
                mem::size_of::<HciFilter>() as socklen_t,
            )
        };
        if ret < 0 {
            return Err(last_os_error("Failed to set HCI filter"));
        }
        Ok(())
    }

    fn send_command(&self, ogf: u16, ocf: u16, params: &[u8]) -> Result<(), ScanError> {
        let packet = hci_command_packet(ogf, ocf, params);
        let ret = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                packet.as_ptr() as *const c_void,
                packet.len(),
            )
        };
        if ret < 0 {
            return Err(last_os_error("Failed to send HCI command"));
        }
        Ok(())
    }

    /// Passive scan, 10ms interval and window, duplicates reported.
    fn enable_le_scan(&self) -> Result<(), ScanError> {
        let interval = 0x0010u16.to_le_bytes(); // 0.625ms units
        let window = 0x0010u16.to_le_bytes();
        let params = [
            0x00, // passive
            interval[0],
            interval[1],
            window[0],
            window[1],
            0x00, // public own address
            0x00, // accept all
        ];
        self.send_command(OGF_LE_CTL, OCF_LE_SET_SCAN_PARAMETERS, &params)?;
        self.set_scan_enable(true)
    }

    fn set_scan_enable(&self, enable: bool) -> Result<(), ScanError> {
        self.send_command(OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE, &[u8::from(enable), 0x00])
    }
}

/// Create an HCI command packet
fn hci_command_packet(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let opcode = ((ogf << 10) | ocf).to_le_bytes();
    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(HCI_COMMAND_PKT);
    packet.extend_from_slice(&opcode);
    packet.push(params.len() as u8);
    packet.extend_from_slice(params);
    packet
}

/// Collect service data entries from advertising data AD structures.
fn parse_service_data(ad_data: &[u8]) -> HashMap<u128, Vec<u8>> {
    let mut service_data = HashMap::new();
    let mut rest = ad_data;

    while let [len, tail @ ..] = rest {
        let len = usize::from(*len);
        if len == 0 || len > tail.len() {
            break;
        }
        let (structure, next) = tail.split_at(len);
        rest = next;

        match structure {
            [AD_TYPE_SERVICE_DATA_UUID16, lo, hi, payload @ ..] => {
                let uuid = uuid_from_u16(u16::from_le_bytes([*lo, *hi]));
                service_data.insert(uuid, payload.to_vec());
            }
            [AD_TYPE_SERVICE_DATA_UUID128, body @ ..] if body.len() >= 16 => {
                let (uuid, payload) = body.split_at(16);
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(uuid);
                service_data.insert(u128::from_le_bytes(bytes), payload.to_vec());
            }
            _ => {}
        }
    }

    service_data
}

/// Parse the first report of an LE advertising report event.
///
/// `event` starts at the HCI packet type byte. Returns `None` for reports
/// without service data or that are cut short.
fn parse_advertising_report(event: &[u8]) -> Option<RawAdvertisement> {
    // packet type, event code, parameter length, subevent
    let report = event.get(4..)?;
    let (&num_reports, report) = report.split_first()?;
    if num_reports == 0 {
        return None;
    }

    // event type (1), address type (1), address (6), data length (1)
    let address: [u8; 6] = report.get(2..8)?.try_into().ok()?;
    let data_len = usize::from(*report.get(8)?);
    let ad_data = report.get(9..9 + data_len)?;
    let rssi = report.get(9 + data_len).map_or(0, |&b| i16::from(b as i8));

    let service_data = parse_service_data(ad_data);
    if service_data.is_empty() {
        return None;
    }

    Some(RawAdvertisement {
        address: MacAddress::from_le_bytes(address),
        rssi,
        service_data,
    })
}

fn read_packet(fd: &OwnedFd, buf: &mut [u8]) -> io::Result<usize> {
    let ret = unsafe { libc::read(fd.as_raw_fd(), buf.as_mut_ptr() as *mut c_void, buf.len()) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

/// Start scanning for SwitchBot Meters using raw HCI sockets on hci0.
///
/// Advertisements are sent through the returned channel until the receiver
/// is dropped, at which point LE scanning is disabled again.
pub async fn start_scan() -> Result<mpsc::Receiver<RawAdvertisement>, ScanError> {
    let events = HciSocket::open(0)?;
    events.set_filter(&HciFilter::le_meta_events())?;

    // Registered before scanning starts so a failure leaves the controller idle.
    let async_fd = AsyncFd::new(events.fd)
        .map_err(|e| ScanError::Bluetooth(format!("Failed to create async fd: {e}")))?;

    let commands = HciSocket::open(0)?;
    commands.enable_le_scan()?;
    log::info!("scanning on hci0");

    let (tx, rx) = mpsc::channel(ADVERTISEMENT_CHANNEL_BUFFER_SIZE);

    tokio::spawn(async move {
        let mut buf = [0u8; HCI_MAX_EVENT_SIZE];

        'scan: loop {
            let mut guard = tokio::select! {
                _ = tx.closed() => break,
                guard = async_fd.readable() => match guard {
                    Ok(guard) => guard,
                    Err(e) => {
                        log::error!("HCI socket failed: {e}");
                        break;
                    }
                },
            };

            // Drain all available packets before waiting again
            loop {
                let n = match guard.try_io(|inner| read_packet(inner.get_ref(), &mut buf)) {
                    Ok(Ok(n)) if n > 0 => n,
                    Ok(Ok(_)) | Err(_) => break,
                    Ok(Err(e)) => {
                        log::error!("HCI read failed: {e}");
                        break 'scan;
                    }
                };

                let packet = &buf[..n];
                if n >= 4
                    && packet[0] == HCI_EVENT_PKT
                    && packet[1] == EVT_LE_META_EVENT
                    && packet[3] == EVT_LE_ADVERTISING_REPORT
                    && let Some(adv) = parse_advertising_report(packet)
                    && tx.send(adv).await.is_err()
                {
                    break 'scan;
                }
            }
        }

        if let Err(e) = commands.set_scan_enable(false) {
            log::warn!("{e}");
        }
        log::debug!("hci scan stopped");
    });

    Ok(rx)
}
