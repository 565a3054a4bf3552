use std::{fs::remove_file, io};

use disk::{make_name, Disk};
use log::info;
use user_pager::{Pager, PagerConfig, PagerError, SimulatedMmu, DEFAULT_PAGE_SIZE};

const FRAMES: usize = 4;
const BLOCKS: usize = 16;

fn run(disk: Disk<DEFAULT_PAGE_SIZE>) -> Result<(), PagerError> {
    let mmu = SimulatedMmu::<DEFAULT_PAGE_SIZE>::new(FRAMES);
    let mut pager: Pager<_, _, DEFAULT_PAGE_SIZE> =
        Pager::init(PagerConfig::new(FRAMES, BLOCKS), mmu, disk);
    println!("---- Pager initialized ----");

    pager.register_process(100)?;
    pager.register_process(200)?;
    let mut pages = Vec::new();
    for _ in 0..3 {
        pages.push((100, pager.extend(100)?));
        pages.push((200, pager.extend(200)?));
    }

    // Six pages over four frames: the later writes push earlier pages to swap.
    for (i, &(pid, addr)) in pages.iter().enumerate() {
        pager.write_user(pid, addr, format!("page {} of {}", i, pid).as_bytes())?;
    }
    for &(pid, addr) in &pages {
        let bytes = pager.read_user(pid, addr, 16)?;
        info!("{}@{:#x}: {:?}", pid, addr, String::from_utf8_lossy(&bytes));
    }

    let (pid, addr) = pages[pages.len() - 1];
    print!("dump {}@{:#x}: ", pid, addr);
    pager.read_range(pid, addr, 16, &mut io::stdout())?;

    pager.destroy_process(100);
    pager.destroy_process(200);
    println!("{:?}", pager.stats());
    println!(
        "free frames: {}, free blocks: {}",
        pager.free_frames(),
        pager.free_blocks()
    );
    println!("---- Pager closed ----");
    Ok(())
}

fn main() {
    env_logger::init();
    let disk = match Disk::<DEFAULT_PAGE_SIZE>::create("main", BLOCKS) {
        Ok(disk) => disk,
        Err(err) => {
            eprintln!("Cannot create swap device: {}", err);
            std::process::exit(1);
        }
    };
    let result = run(disk);
    let _ = remove_file(make_name("main"));
    if let Err(err) = result {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
