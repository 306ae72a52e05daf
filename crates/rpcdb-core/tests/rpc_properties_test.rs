//! Integration test: lookup and iteration contracts of the RPC database.
//!
//! Builds deterministic synthetic `/etc/rpc` files (with comments, malformed
//! lines and duplicate numbers mixed in) and checks:
//! 1. every canonical name and every alias resolves to its own record,
//! 2. number lookups return the first record in file order,
//! 3. iteration yields every record exactly once, in file order,
//! 4. absent keys are "not found", never errors,
//! 5. reentrant lookups never truncate.
//!
//! Run: cargo test -p rpcdb-core --test rpc_properties_test

use rpcdb_core::rpc::{RpcDatabase, RpcEntry, RpcError, parse_all};

/// Small deterministic generator (xorshift64*).
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        self.0.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

struct Generated {
    content: Vec<u8>,
    records: Vec<RpcEntry>,
}

fn generate(seed: u64, count: usize) -> Generated {
    let mut rng = Lcg(seed | 1);
    let mut content = Vec::new();
    let mut records = Vec::new();
    content.extend_from_slice(b"# synthetic rpc database\n\n");

    for i in 0..count {
        // Numbers collide on purpose: roughly every fourth record reuses one.
        let number = 100_000 + rng.below(count as u64 * 3 / 4 + 1) as u32;
        let alias_count = rng.below(4) as usize;
        let name = format!("prog{i}");
        let aliases: Vec<String> = (0..alias_count).map(|a| format!("p{i}a{a}")).collect();

        let sep = if rng.below(2) == 0 { "\t" } else { "  " };
        let mut line = format!("{name}{sep}{number}");
        for alias in &aliases {
            line.push(' ');
            line.push_str(alias);
        }
        if rng.below(5) == 0 {
            line.push_str("  # trailing comment");
        }
        content.extend_from_slice(line.as_bytes());
        content.push(b'\n');

        if rng.below(6) == 0 {
            content.extend_from_slice(b"malformed-line-without-number\n");
        }
        if rng.below(7) == 0 {
            content.extend_from_slice(b"# interleaved comment\n");
        }

        records.push(RpcEntry {
            r_name: name.into_bytes(),
            r_aliases: aliases.into_iter().map(String::into_bytes).collect(),
            r_number: number,
        });
    }

    Generated { content, records }
}

#[test]
fn every_name_and_alias_resolves_to_its_record() {
    for seed in [1u64, 7, 42, 9001] {
        let generated = generate(seed, 64);
        let mut db = RpcDatabase::from_bytes(generated.content.clone());
        for record in &generated.records {
            for key in record.names() {
                let found = db
                    .lookup_by_name(key)
                    .expect("in-memory database never fails")
                    .expect("every generated name must resolve");
                assert_eq!(&found, record, "seed {seed}, key {key:?}");
            }
        }
    }
}

#[test]
fn number_lookup_returns_first_record_in_file_order() {
    for seed in [3u64, 11, 1234] {
        let generated = generate(seed, 80);
        let mut db = RpcDatabase::from_bytes(generated.content.clone());
        for record in &generated.records {
            let expected = generated
                .records
                .iter()
                .find(|r| r.r_number == record.r_number)
                .unwrap();
            let found = db.lookup_by_number(record.r_number).unwrap().unwrap();
            assert_eq!(&found, expected, "seed {seed}, number {}", record.r_number);
        }
    }
}

#[test]
fn iteration_yields_every_record_once_in_order() {
    let generated = generate(77, 100);
    let mut db = RpcDatabase::from_bytes(generated.content.clone());
    let cursor = db.begin_iteration().unwrap();
    let iterated: Vec<RpcEntry> = cursor.collect();
    assert_eq!(iterated, generated.records);
    assert_eq!(parse_all(&generated.content), generated.records);

    let stats = db.last_parse_stats().unwrap();
    assert_eq!(stats.parsed_entries, generated.records.len());
}

#[test]
fn absent_keys_are_not_found() {
    let generated = generate(5, 32);
    let mut db = RpcDatabase::from_bytes(generated.content);
    assert!(db.lookup_by_name(b"prog-absent").unwrap().is_none());
    assert!(db.lookup_by_name(b"malformed-line-without-number").unwrap().is_none());
    assert!(db.lookup_by_number(1).unwrap().is_none());
    assert!(db.lookup_by_number(u32::MAX).unwrap().is_none());
}

#[test]
fn reentrant_lookup_needs_exact_packed_len() {
    let generated = generate(99, 40);
    let mut db = RpcDatabase::from_bytes(generated.content.clone());
    for record in &generated.records {
        let needed = record.packed_len();

        let mut short = vec![0x5Au8; needed - 1];
        match db.lookup_by_name_into(&record.r_name, &mut short) {
            Err(RpcError::BufferTooSmall {
                needed: reported,
                available,
            }) => {
                assert_eq!(reported, needed);
                assert_eq!(available, needed - 1);
            }
            other => panic!("expected BufferTooSmall, got {other:?}"),
        }
        assert!(short.iter().all(|&b| b == 0x5A), "no partial write");

        let mut exact = vec![0u8; needed];
        let view = db
            .lookup_by_name_into(&record.r_name, &mut exact)
            .unwrap()
            .unwrap();
        assert_eq!(&view.to_entry(), record);
    }
}

#[test]
fn portmapper_rusersd_database() {
    let mut db =
        RpcDatabase::from_bytes(&b"portmapper 100000 portmap sunrpc\nrusersd 100002\n"[..]);

    let by_alias = db.lookup_by_name(b"sunrpc").unwrap().unwrap();
    assert_eq!(by_alias.r_name, b"portmapper");
    assert_eq!(by_alias.r_number, 100000);

    let by_number = db.lookup_by_number(100002).unwrap().unwrap();
    assert_eq!(by_number.r_name, b"rusersd");

    assert!(db.lookup_by_name(b"nfs").unwrap().is_none());
}
