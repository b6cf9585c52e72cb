use rheap::{Heap, HeapConfig, PlacementPolicy};

/// Prints the block list with a step title.
fn print_heap(
  step: &str,
  heap: &Heap,
) {
  println!("\n[{}]", step);
  print!("{}", heap);
}

fn main() {
  env_logger::init();
  rheap::enable_logging();

  // RHEAP_POLICY / RHEAP_MAX_BLOCKS pick the starting configuration.
  let config = match HeapConfig::from_env() {
    Ok(config) => config,
    Err(err) => {
      eprintln!("bad configuration: {}", err);
      std::process::exit(2);
    }
  };

  let mut heap = match Heap::with_config(100, config) {
    Ok(heap) => heap,
    Err(err) => {
      eprintln!("cannot create heap: {}", err);
      std::process::exit(1);
    }
  };
  print_heap("create(100)", &heap);

  // --------------------------------------------------------------------
  // 1) Two allocations split the initial free block.
  // --------------------------------------------------------------------
  let a = heap.allocate(30, "A").expect("allocate A");
  let b = heap.allocate(20, "B").expect("allocate B");
  print_heap("allocate 30 \"A\", 20 \"B\"", &heap);

  // Write something into B to show it is usable memory.
  if let Some(bytes) = heap.bytes_mut(b) {
    bytes.fill(0xAB);
  }
  println!("B starts with {:#X?}", &heap.bytes(b).unwrap_or_default()[..4]);

  // --------------------------------------------------------------------
  // 2) Freeing B merges it with the free space to its right.
  // --------------------------------------------------------------------
  heap.deallocate(b).expect("free B");
  print_heap("deallocate B", &heap);

  // --------------------------------------------------------------------
  // 3) Carve holes of 50, 10 and 30 bytes and compare the policies.
  // --------------------------------------------------------------------
  heap.deallocate(a).expect("free A");
  let hole_50 = heap.allocate(50, "H50").expect("allocate H50");
  let _spacer = heap.allocate(1, "S1").expect("allocate S1");
  let hole_10 = heap.allocate(10, "H10").expect("allocate H10");
  let _spacer = heap.allocate(1, "S2").expect("allocate S2");
  let hole_30 = heap.allocate(30, "H30").expect("allocate H30");
  // Fill the 8 byte tail so the last hole cannot merge with it.
  let _spacer = heap.allocate(8, "S3").expect("allocate S3");
  for hole in [hole_50, hole_10, hole_30] {
    heap.deallocate(hole).expect("free hole");
  }
  print_heap("holes of 50, 10 and 30 bytes", &heap);

  for policy in [PlacementPolicy::FirstFit, PlacementPolicy::BestFit] {
    heap.set_policy(policy);
    let address = heap.allocate(20, "R").expect("allocate R");
    println!("\n{} places 20 bytes at {}", policy, address);
    heap.deallocate(address).expect("free R");
  }

  // --------------------------------------------------------------------
  // 4) Errors are values.
  // --------------------------------------------------------------------
  if let Err(err) = heap.allocate(200, "BIG") {
    println!("\nallocate 200: {}", err);
  }
  if let Err(err) = heap.deallocate(hole_10) {
    println!("deallocate {} again: {}", hole_10, err);
  }

  println!("\n{:#?}", heap.stats());
  heap.destroy();
}
