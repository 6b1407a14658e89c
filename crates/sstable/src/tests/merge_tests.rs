use crate::{merge, SsTable};
use memtable::{Entry, Memtable};
use record::Record;
use std::fs::File;
use std::io::BufReader;
use tempfile::tempdir;

fn table_from(dir: &std::path::Path, name: &str, entries: &[(&[u8], Option<&[u8]>)]) -> SsTable {
    let mut mem = Memtable::new();
    for (k, v) in entries {
        match v {
            Some(v) => mem.insert(k.to_vec(), v.to_vec()),
            None => mem.remove(k.to_vec()),
        }
    }
    SsTable::create(dir.join(name), &mem).unwrap()
}

/// Reads back every record of a table file in order.
fn dump(table: &SsTable) -> Vec<Record> {
    let mut rdr = BufReader::new(File::open(table.path()).unwrap());
    let mut recs = Vec::new();
    while let Some(r) = Record::read_from(&mut rdr).unwrap() {
        recs.push(r);
    }
    recs
}

#[test]
fn newer_record_wins_on_duplicate_key() {
    let dir = tempdir().unwrap();
    let prev = table_from(dir.path(), "lsm_1.sstable", &[(b"k", Some(b"old"))]);
    let curr = table_from(dir.path(), "lsm_2.sstable", &[(b"k", Some(b"new"))]);

    let out = merge(&prev, &curr, &dir.path().join("lsm_3.sstable")).unwrap();

    assert_eq!(out.get(b"k").unwrap(), Some(Entry::Value(b"new".to_vec())));
    let recs = dump(&out);
    assert_eq!(recs.len(), 1);
}

#[test]
fn disjoint_keys_interleave_sorted() {
    let dir = tempdir().unwrap();
    let prev = table_from(
        dir.path(),
        "lsm_1.sstable",
        &[(b"a", Some(b"1")), (b"c", Some(b"3")), (b"e", Some(b"5"))],
    );
    let curr = table_from(
        dir.path(),
        "lsm_2.sstable",
        &[(b"b", Some(b"2")), (b"d", Some(b"4"))],
    );

    let out = merge(&prev, &curr, &dir.path().join("lsm_3.sstable")).unwrap();

    let keys: Vec<Vec<u8>> = dump(&out).into_iter().map(|r| r.key).collect();
    assert_eq!(
        keys,
        vec![
            b"a".to_vec(),
            b"b".to_vec(),
            b"c".to_vec(),
            b"d".to_vec(),
            b"e".to_vec()
        ]
    );
}

#[test]
fn one_side_exhausted_drains_the_other() {
    let dir = tempdir().unwrap();
    let prev = table_from(dir.path(), "lsm_1.sstable", &[(b"a", Some(b"1"))]);
    let curr = table_from(
        dir.path(),
        "lsm_2.sstable",
        &[(b"x", Some(b"24")), (b"y", Some(b"25")), (b"z", Some(b"26"))],
    );

    let out = merge(&prev, &curr, &dir.path().join("lsm_3.sstable")).unwrap();
    assert_eq!(dump(&out).len(), 4);
    assert_eq!(out.get(b"z").unwrap(), Some(Entry::Value(b"26".to_vec())));
}

#[test]
fn tombstones_survive_the_merge() {
    let dir = tempdir().unwrap();
    let prev = table_from(dir.path(), "lsm_1.sstable", &[(b"k", Some(b"live"))]);
    let curr = table_from(dir.path(), "lsm_2.sstable", &[(b"k", None)]);

    let out = merge(&prev, &curr, &dir.path().join("lsm_3.sstable")).unwrap();

    // The tombstone may still shadow an older table not in this merge, so
    // it must be written, not elided.
    assert_eq!(out.get(b"k").unwrap(), Some(Entry::Tombstone));
    let recs = dump(&out);
    assert_eq!(recs.len(), 1);
    assert!(recs[0].deleted);
}

#[test]
fn tombstone_in_older_table_survives_too() {
    let dir = tempdir().unwrap();
    let prev = table_from(dir.path(), "lsm_1.sstable", &[(b"dead", None)]);
    let curr = table_from(dir.path(), "lsm_2.sstable", &[(b"live", Some(b"v"))]);

    let out = merge(&prev, &curr, &dir.path().join("lsm_3.sstable")).unwrap();

    assert_eq!(out.get(b"dead").unwrap(), Some(Entry::Tombstone));
    assert_eq!(out.get(b"live").unwrap(), Some(Entry::Value(b"v".to_vec())));
}

#[test]
fn merge_matches_newest_first_lookup() {
    let dir = tempdir().unwrap();

    let prev_entries: Vec<(Vec<u8>, Option<Vec<u8>>)> = (0..200)
        .map(|i| (format!("k{:04}", i).into_bytes(), Some(b"old".to_vec())))
        .collect();
    let curr_entries: Vec<(Vec<u8>, Option<Vec<u8>>)> = (100..300)
        .map(|i| {
            let v = if i % 7 == 0 { None } else { Some(b"new".to_vec()) };
            (format!("k{:04}", i).into_bytes(), v)
        })
        .collect();

    let mut prev_mem = Memtable::new();
    for (k, v) in &prev_entries {
        match v {
            Some(v) => prev_mem.insert(k.clone(), v.clone()),
            None => prev_mem.remove(k.clone()),
        }
    }
    let mut curr_mem = Memtable::new();
    for (k, v) in &curr_entries {
        match v {
            Some(v) => curr_mem.insert(k.clone(), v.clone()),
            None => curr_mem.remove(k.clone()),
        }
    }

    let prev = SsTable::create(dir.path().join("lsm_1.sstable"), &prev_mem).unwrap();
    let curr = SsTable::create(dir.path().join("lsm_2.sstable"), &curr_mem).unwrap();
    let out = merge(&prev, &curr, &dir.path().join("lsm_3.sstable")).unwrap();

    // For every key, the merged table must agree with "consult curr, then
    // prev" in that order.
    for i in 0..300 {
        let key = format!("k{:04}", i).into_bytes();
        let expected = match curr.get(&key).unwrap() {
            Some(e) => Some(e),
            None => prev.get(&key).unwrap(),
        };
        assert_eq!(out.get(&key).unwrap(), expected, "key k{:04}", i);
    }
}

#[test]
fn failed_merge_leaves_inputs_untouched() {
    let dir = tempdir().unwrap();
    let prev = table_from(dir.path(), "lsm_1.sstable", &[(b"a", Some(b"1"))]);
    let curr = table_from(dir.path(), "lsm_2.sstable", &[(b"b", Some(b"2"))]);

    // Output path already exists: the exclusive create must fail.
    let out_path = dir.path().join("lsm_3.sstable");
    std::fs::write(&out_path, b"in the way").unwrap();

    assert!(merge(&prev, &curr, &out_path).is_err());
    assert_eq!(prev.get(b"a").unwrap(), Some(Entry::Value(b"1".to_vec())));
    assert_eq!(curr.get(b"b").unwrap(), Some(Entry::Value(b"2".to_vec())));
}
