use super::*;
use rand::RngCore;
use std::io::Write;
use tempfile::NamedTempFile;

const DISK_LEN: usize = 1 << 16;

fn image_with(data: &[u8]) -> NamedTempFile {
    let mut tf = NamedTempFile::new().expect("tmp file");
    tf.write_all(data).expect("write image");
    tf.flush().expect("flush image");
    tf
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::rng().fill_bytes(&mut data);
    data
}

#[test]
fn disk_reports_image_length() {
    let tf = image_with(&vec![0u8; DISK_LEN]);
    let d = Disk::open(tf.path()).expect("open");
    assert_eq!(d.len(), DISK_LEN as u64, "disk length must match the image");
    assert!(!d.is_empty());
    assert_eq!(d.path(), tf.path());
}

#[test]
fn read_at_returns_image_bytes() {
    let data = random_bytes(DISK_LEN);
    let tf = image_with(&data);
    let d = Disk::open(tf.path()).expect("open");

    let off = 4096 + 123;
    let mut back = vec![0u8; 8192];
    let n = d.read_at(off as u64, &mut back);
    assert_eq!(n, back.len(), "must read full buffer");
    assert_eq!(back, data[off..off + 8192]);
}

#[test]
fn read_past_end_is_truncated() {
    let tf = image_with(&vec![0u8; DISK_LEN]);
    let d = Disk::open(tf.path()).expect("open");

    let mut buf = vec![0xCCu8; 4096];
    let n = d.read_at(DISK_LEN as u64 - 512, &mut buf);
    assert_eq!(n, 512, "read must truncate at EOF");
    assert!(buf[..512].iter().all(|&b| b == 0));
    assert!(
        buf[512..].iter().all(|&b| b == 0xCC),
        "untouched tail must remain"
    );
    assert_eq!(d.read_at(DISK_LEN as u64 + 1, &mut buf), 0);
}

#[test]
fn empty_image_reads_nothing() {
    let tf = image_with(&[]);
    let d = Disk::open(tf.path()).expect("open");
    assert!(d.is_empty());
    let mut buf = [0u8; 16];
    assert_eq!(d.read_at(0, &mut buf), 0);
}

#[test]
fn image_devices_follow_aliases_and_cursor() {
    let data = random_bytes(DISK_LEN);
    let tf = image_with(&data);

    let mut devices = ImageDevices::new();
    devices.map("/pci@f2000000/ata-6@d/@0:3", tf.path());

    let mut handle = devices.open("/pci@f2000000/ata-6@d/@0:3").expect("open");
    assert_eq!(handle.disk().len(), DISK_LEN as u64);
    devices.seek(&mut handle, 100).expect("seek");

    let mut first = [0u8; 10];
    assert_eq!(devices.read(&mut handle, &mut first).expect("read"), 10);
    let mut second = [0u8; 10];
    assert_eq!(devices.read(&mut handle, &mut second).expect("read"), 10);
    assert_eq!(first, data[100..110]);
    assert_eq!(second, data[110..120], "reads advance the cursor");
    devices.close(handle);
}

#[test]
fn image_devices_fall_back_to_host_paths() {
    let tf = image_with(b"plain");
    let mut devices = ImageDevices::new();
    let path = tf.path().to_string_lossy().into_owned();
    let mut handle = devices.open(&path).expect("open");
    let mut buf = [0u8; 8];
    assert_eq!(devices.read(&mut handle, &mut buf).expect("read"), 5);
    assert!(devices.open("/no/such/device").is_err());
}

#[test]
fn mem_devices_log_reads_and_inject_failures() {
    let mut devices = MemDevices::new();
    devices.insert("a", vec![7u8; 64]);
    devices.insert("b", vec![9u8; 64]);
    devices.fail_reads("b");

    let mut a = devices.open("a").expect("open a");
    devices.seek(&mut a, 60).expect("seek");
    let mut buf = [0u8; 8];
    assert_eq!(devices.read(&mut a, &mut buf).expect("short read"), 4);

    let mut b = devices.open("b").expect("open b");
    assert!(devices.read(&mut b, &mut buf).is_err());

    assert_eq!(
        devices.reads(),
        &[
            DeviceRead { path: "a".into(), offset: 60, len: 8 },
            DeviceRead { path: "b".into(), offset: 0, len: 8 },
        ]
    );
    devices.close(a);
    devices.close(b);
    assert_eq!((devices.opens(), devices.closes()), (2, 2));
    assert!(devices.open("missing").is_err());
}
