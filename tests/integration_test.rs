use std::{fs::remove_file, thread};

use disk::{make_name, Disk};
use serial_test::serial;
use user_pager::{
    PageState, Pager, PagerConfig, PagerError, SharedPager, SimulatedMmu, UVM_BASE_ADDR,
};

const PAGE: usize = 128;
static IMAGE: &str = "integration";

type SimPager = Pager<SimulatedMmu<PAGE>, Disk<PAGE>, PAGE>;

fn initialize(frames: usize, blocks: usize) -> SimPager {
    let _ = env_logger::builder().is_test(true).try_init();
    let disk = Disk::<PAGE>::create(IMAGE, blocks).unwrap();
    Pager::init(
        PagerConfig::new(frames, blocks),
        SimulatedMmu::new(frames),
        disk,
    )
}

fn cleanup() {
    let _ = remove_file(make_name(IMAGE));
}

#[test]
#[serial]
fn test_two_processes_share_few_frames() {
    let mut pager = initialize(2, 8);
    pager.register_process(1).unwrap();
    pager.register_process(2).unwrap();
    let mut pages = Vec::new();
    for _ in 0..3 {
        pages.push((1, pager.extend(1).unwrap()));
        pages.push((2, pager.extend(2).unwrap()));
    }

    for (i, &(pid, addr)) in pages.iter().enumerate() {
        pager.write_user(pid, addr, &[i as u8 + 1; PAGE]).unwrap();
    }
    for (i, &(pid, addr)) in pages.iter().enumerate() {
        assert_eq!(pager.read_user(pid, addr, PAGE).unwrap(), vec![i as u8 + 1; PAGE]);
        pager.check_invariants().unwrap();
    }
    assert!(pager.stats().evictions >= 4);
    assert_eq!(pager.free_frames(), 0);

    pager.destroy_process(1);
    pager.destroy_process(2);
    assert_eq!(pager.free_frames(), 2);
    assert_eq!(pager.free_blocks(), 8);
    cleanup();
}

#[test]
#[serial]
fn test_writes_across_a_page_boundary() {
    let mut pager = initialize(2, 4);
    pager.register_process(7).unwrap();
    let first = pager.extend(7).unwrap();
    let second = pager.extend(7).unwrap();
    assert_eq!(second, first + PAGE);

    let data: Vec<u8> = (0..32).collect();
    pager.write_user(7, second - 16, &data).unwrap();
    assert_eq!(pager.page_state(7, first), Ok(PageState::ResidentReadWrite));
    assert_eq!(pager.page_state(7, second), Ok(PageState::ResidentReadWrite));

    let mut out = Vec::new();
    pager.read_range(7, second - 2, 4, &mut out).unwrap();
    assert_eq!(out, b"0e0f1011\n".to_vec());
    cleanup();
}

#[test]
#[serial]
fn test_access_past_the_last_page_is_invalid() {
    let mut pager = initialize(1, 2);
    pager.register_process(3).unwrap();
    let addr = pager.extend(3).unwrap();
    assert_eq!(
        pager.write_user(3, addr + PAGE, &[1]),
        Err(PagerError::InvalidAddress { pid: 3, addr: addr + PAGE })
    );
    assert_eq!(
        pager.read_user(3, UVM_BASE_ADDR - 4, 8),
        Err(PagerError::InvalidAddress { pid: 3, addr: UVM_BASE_ADDR - 4 })
    );
    assert_eq!(pager.free_frames(), 1);
    cleanup();
}

#[test]
#[serial]
fn test_access_wrapping_the_address_space_is_invalid() {
    let mut pager = initialize(1, 1);
    pager.register_process(3).unwrap();
    pager.extend(3).unwrap();
    let addr = usize::MAX - 1;
    assert_eq!(
        pager.read_user(3, addr, 4),
        Err(PagerError::InvalidAddress { pid: 3, addr })
    );
    assert_eq!(
        pager.write_user(3, addr, &[1, 2, 3, 4]),
        Err(PagerError::InvalidAddress { pid: 3, addr })
    );
    assert_eq!(pager.stats().faults, 0);
    assert_eq!(pager.free_frames(), 1);
    cleanup();
}

#[test]
#[serial]
fn test_disk_image_reconnects_with_evicted_pages() {
    let mut pager = initialize(1, 2);
    pager.register_process(1).unwrap();
    let a = pager.extend(1).unwrap();
    let b = pager.extend(1).unwrap();
    pager.write_user(1, a, b"persisted").unwrap();
    pager.handle_fault(1, b).unwrap();
    assert_eq!(pager.page_state(1, a), Ok(PageState::OnDiskOnly));

    let disk = Disk::<PAGE>::connect(IMAGE).unwrap();
    let mut block = [0; PAGE];
    disk.read_block(0, &mut block).unwrap();
    assert_eq!(&block[..9], b"persisted");
    cleanup();
}

#[test]
#[serial]
fn test_shared_pager_serves_threads() {
    let shared = SharedPager::new(initialize(4, 16));
    let handles: Vec<_> = (1..=4)
        .map(|pid| {
            let shared = shared.clone();
            thread::spawn(move || {
                shared.register_process(pid).unwrap();
                let pages: Vec<usize> = (0..3).map(|_| shared.extend(pid).unwrap()).collect();
                for round in 0..10u8 {
                    for (i, addr) in pages.iter().enumerate() {
                        let value = pid as u8 * 16 + i as u8 + round;
                        shared.lock().write_user(pid, *addr, &[value; 8]).unwrap();
                        assert_eq!(
                            shared.lock().read_user(pid, *addr, 8).unwrap(),
                            vec![value; 8]
                        );
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    {
        let pager = shared.lock();
        pager.check_invariants().unwrap();
        assert_eq!(pager.free_blocks(), 4);
        assert_eq!(pager.free_frames(), 0);
    }
    for pid in 1..=4 {
        shared.destroy_process(pid);
    }
    shared.destroy_process(1);
    assert_eq!(shared.lock().free_frames(), 4);
    assert_eq!(shared.lock().free_blocks(), 16);
    cleanup();
}
