use std::{
  alloc::{GlobalAlloc, Layout},
  io::Read,
  ptr,
};

use brkalloc::{LockedAllocator, SbrkHeap};

// Everything this program allocates, `println!` buffers included, comes out
// of the same sbrk heap, so nothing else moves the program break.
#[global_allocator]
static ALLOCATOR: LockedAllocator<SbrkHeap> = LockedAllocator::new(SbrkHeap::new());

/// Waits until the user presses ENTER.
/// Useful to inspect the process with `pmap` or `gdb` between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break = {:?}, heap boundary = {:#x}",
    label,
    std::process::id(),
    SbrkHeap::program_break(),
    ALLOCATOR.boundary(),
  );
}

fn print_alloc(
  layout: Layout,
  address: *mut u8,
) {
  println!(
    "Allocated {} bytes, address = {:?}, program break = {:?}",
    layout.size(),
    address,
    SbrkHeap::program_break(),
  );
}

fn main() {
  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // 1) Three neighbouring blocks.
    let layout_a = Layout::array::<u8>(10).unwrap();
    let layout_b = Layout::array::<u8>(20).unwrap();
    let layout_c = Layout::array::<u8>(30).unwrap();
    let a = ALLOCATOR.alloc(layout_a);
    let b = ALLOCATOR.alloc(layout_b);
    let c = ALLOCATOR.alloc(layout_c);
    println!("\n[1] Allocate 10, 20 and 30 bytes");
    print_alloc(layout_a, a);
    print_alloc(layout_b, b);
    print_alloc(layout_c, c);
    ptr::write_bytes(b, 0xAB, layout_b.size());

    block_until_enter_pressed();

    // 2) Free the middle one: it becomes a hole, the break stays put.
    ALLOCATOR.dealloc(b, layout_b);
    println!("\n[2] Released the 20 byte block at {:?}", b);
    print_program_break("after release");

    block_until_enter_pressed();

    // 3) A smaller request lands in the hole (first fit).
    let layout_d = Layout::array::<u8>(15).unwrap();
    let d = ALLOCATOR.alloc(layout_d);
    println!("\n[3] Allocate 15 bytes");
    print_alloc(layout_d, d);
    println!(
      "[3] reused the hole? {}",
      if d == b { "Yes" } else { "No, it allocated somewhere else" }
    );

    block_until_enter_pressed();

    // 4) A large block grows the heap, releasing it shrinks it again.
    print_program_break("before large alloc");
    let layout_big = Layout::array::<u8>(64 * 1024).unwrap();
    let big = ALLOCATOR.alloc(layout_big);
    println!("\n[4] Allocate 64 KiB");
    print_alloc(layout_big, big);
    print_program_break("after large alloc");

    ALLOCATOR.dealloc(big, layout_big);
    print_program_break("after large release");

    block_until_enter_pressed();

    // 5) Release the rest; trailing free blocks go back to the OS.
    ALLOCATOR.dealloc(c, layout_c);
    ALLOCATOR.dealloc(d, layout_d);
    ALLOCATOR.dealloc(a, layout_a);
    println!("\n[5] Released everything");
    print_program_break("end");
  }
}
