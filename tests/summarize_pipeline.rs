//! Integration tests for the group-wise abundance summary.

use seqtab_summary::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

const SITES: [&str; 3] = ["buccal", "plaque", "saliva"];

/// Write a synthetic sequence table with `n_samples` rows.
///
/// - ASV_0..ASV_4: present everywhere, enriched in saliva
/// - ASV_5..ASV_9: present in plaque only
/// - ASV_10: never observed
fn write_synthetic_seqtab(path: &Path, n_samples: usize) {
    let mut rng_seed = 42u64;
    let mut simple_rand = || -> f64 {
        rng_seed = rng_seed.wrapping_mul(1103515245).wrapping_add(12345);
        ((rng_seed >> 16) & 0x7FFF) as f64 / 32768.0
    };

    let mut file = fs::File::create(path).unwrap();
    let header: Vec<String> = (0..11).map(|i| format!("ASV_{}", i)).collect();
    writeln!(file, "row_names\t{}", header.join("\t")).unwrap();

    for sample in 0..n_samples {
        let site = SITES[sample % 3];
        let counts: Vec<String> = (0..11)
            .map(|feat| {
                let base = match (feat, site) {
                    (0..=4, "saliva") => 300.0,
                    (0..=4, _) => 100.0,
                    (5..=9, "plaque") => 50.0,
                    _ => 0.0,
                };
                let noise = 0.9 + 0.2 * simple_rand();
                format!("{}", (base * noise).round() as u64)
            })
            .collect();
        writeln!(file, "sample_{}\t{}", sample, counts.join("\t")).unwrap();
    }
}

/// Write metadata for `n_samples` samples plus one sample without sequences.
fn write_synthetic_metadata(path: &Path, n_samples: usize) {
    let mut file = fs::File::create(path).unwrap();
    writeln!(file, "subject\tmanifest_id\tbody_site\tstudy").unwrap();
    for sample in 0..n_samples {
        let study = if sample < n_samples / 2 { "DOMHaIN" } else { "pilot" };
        writeln!(
            file,
            "P{}\tsample_{}\t{}\t{}",
            sample / 3,
            sample,
            SITES[sample % 3],
            study
        )
        .unwrap();
    }
    writeln!(file, "P99\tsample_orphan\tsaliva\tpilot").unwrap();
}

fn load_synthetic(n_samples: usize) -> (CountMatrix, Metadata) {
    let seqtab = NamedTempFile::new().unwrap();
    let meta = NamedTempFile::new().unwrap();
    write_synthetic_seqtab(seqtab.path(), n_samples);
    write_synthetic_metadata(meta.path(), n_samples);
    (
        CountMatrix::from_seqtab_tsv(seqtab.path(), "row_names").unwrap(),
        Metadata::from_tsv(meta.path(), "manifest_id").unwrap(),
    )
}

#[test]
fn test_rows_sum_to_one() {
    let (counts, metadata) = load_synthetic(30);
    let table = Summary::new("body_site")
        .zero_rows(ZeroRowPolicy::Drop)
        .run(&counts, &metadata)
        .unwrap();

    assert_eq!(table.n_features(), 10);
    for i in 0..table.n_features() {
        let sum = table.row_sum(i);
        assert!((sum - 1.0).abs() < 1e-9, "row {} sums to {}", i, sum);
    }
}

#[test]
fn test_columns_are_distinct_category_values() {
    let (counts, metadata) = load_synthetic(30);
    let table = Summary::new("body_site").run(&counts, &metadata).unwrap();

    let expected: BTreeSet<String> = metadata
        .sample_ids()
        .iter()
        .filter(|sid| counts.sample_ids().contains(*sid))
        .filter_map(|sid| metadata.raw(sid, "body_site").map(String::from))
        .collect();
    let actual: BTreeSet<String> = table.group_labels.iter().cloned().collect();

    assert_eq!(actual, expected);
    assert_eq!(table.group_labels, vec!["buccal", "plaque", "saliva"]);
}

#[test]
fn test_expected_distribution() {
    let (counts, metadata) = load_synthetic(30);
    let table = Summary::new("body_site").run(&counts, &metadata).unwrap();

    let saliva = table.group_index("saliva").unwrap();
    let plaque = table.group_index("plaque").unwrap();

    // Enriched features put ~60% of their mean abundance in saliva
    for feat in 0..5 {
        let v = table.get(feat, saliva);
        assert!(v > 0.5 && v < 0.7, "ASV_{} saliva share {}", feat, v);
    }
    // Plaque-only features are entirely plaque
    for feat in 5..10 {
        assert_eq!(table.get(feat, plaque), 1.0);
    }
    // Never-observed feature is undefined
    let absent = table.feature_index("ASV_10").unwrap();
    assert!(table.row(absent).iter().all(|v| v.is_nan()));
}

#[test]
fn test_output_is_deterministic() {
    let (counts, metadata) = load_synthetic(24);
    let summary = Summary::new("body_site");

    let render = |table: &AbundanceTable| {
        let mut buf = Vec::new();
        table.write_tsv(&mut buf, &TsvFormat::default()).unwrap();
        buf
    };

    let first = render(&summary.run(&counts, &metadata).unwrap());
    let second = render(&summary.run(&counts, &metadata).unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_profile_reports_orphans() {
    let (counts, metadata) = load_synthetic(12);
    let profile = profile_join(&counts, &metadata, "body_site").unwrap();

    assert_eq!(profile.n_matched, 12);
    assert_eq!(profile.unmatched_metadata, vec!["sample_orphan"]);
    assert!(profile.unmatched_seqtab.is_empty());
    assert_eq!(profile.groups.iter().map(|g| g.n_samples).sum::<usize>(), 12);
}

#[test]
fn test_filtered_summary_matches_manual_subset() {
    let (counts, metadata) = load_synthetic(30);
    let filter = SampleFilter::include("study", &["DOMHaIN"]);

    let filtered = Summary::new("body_site")
        .sample_filter(filter.clone())
        .run(&counts, &metadata)
        .unwrap();

    let (subset, stats) = filter_samples(&metadata, &filter).unwrap();
    assert_eq!(stats.n_after, 15);
    let manual = Summary::new("body_site").run(&counts, &subset).unwrap();

    assert_eq!(filtered.matrix().nrows(), manual.matrix().nrows());
    for i in 0..10 {
        for g in 0..filtered.n_groups() {
            assert_eq!(filtered.get(i, g), manual.get(i, g));
        }
    }
}

#[test]
fn test_cli_default_layout() {
    let root = tempfile::tempdir().unwrap();
    let work = root.path().join("05-phylo_trees");
    let reads = root.path().join("01-read_processing");
    fs::create_dir_all(&work).unwrap();
    fs::create_dir_all(&reads).unwrap();
    write_synthetic_seqtab(&reads.join("sequence_table.merged.txt"), 9);
    write_synthetic_metadata(&work.join("map.txt"), 9);

    let output = Command::new(env!("CARGO_BIN_EXE_seqtab-summary"))
        .current_dir(&work)
        .args(["summarize", "-c", "body_site"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let contents = fs::read_to_string(work.join("body_site_abund.txt")).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "\tbuccal\tplaque\tsaliva");
    assert_eq!(lines.len(), 12);
    assert!(lines[6].starts_with("ASV_5\t0.0\t1.0\t0.0"));
}

#[test]
fn test_cli_missing_category_fails() {
    let root = tempfile::tempdir().unwrap();
    let seqtab = root.path().join("seqtab.tsv");
    let meta = root.path().join("map.tsv");
    write_synthetic_seqtab(&seqtab, 6);
    write_synthetic_metadata(&meta, 6);

    let output = Command::new(env!("CARGO_BIN_EXE_seqtab-summary"))
        .current_dir(root.path())
        .args(["summarize", "-c", "hiv_status", "--seqtab"])
        .arg(&seqtab)
        .arg("--metadata")
        .arg(&meta)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Missing column 'hiv_status'"));
    assert!(!root.path().join("hiv_status_abund.txt").exists());
}

#[test]
fn test_cli_include_uses_config_filter_column() {
    let root = tempfile::tempdir().unwrap();
    let seqtab = root.path().join("seqtab.tsv");
    let meta = root.path().join("map.tsv");
    let config = root.path().join("summary.yaml");
    write_synthetic_seqtab(&seqtab, 12);
    write_synthetic_metadata(&meta, 12);
    fs::write(&config, "category: body_site\nsample_filter:\n  column: study\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_seqtab-summary"))
        .current_dir(root.path())
        .args(["profile", "--format", "json", "--include", "DOMHaIN", "--config"])
        .arg(&config)
        .arg("--seqtab")
        .arg(&seqtab)
        .arg("--metadata")
        .arg(&meta)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let profile: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(profile["n_metadata_samples"], 6);
    assert_eq!(profile["n_matched"], 6);
}

#[test]
fn test_cli_include_without_any_filter_column_fails() {
    let root = tempfile::tempdir().unwrap();
    let seqtab = root.path().join("seqtab.tsv");
    let meta = root.path().join("map.tsv");
    write_synthetic_seqtab(&seqtab, 6);
    write_synthetic_metadata(&meta, 6);

    let output = Command::new(env!("CARGO_BIN_EXE_seqtab-summary"))
        .current_dir(root.path())
        .args(["summarize", "-c", "body_site", "--include", "DOMHaIN", "--seqtab"])
        .arg(&seqtab)
        .arg("--metadata")
        .arg(&meta)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("require --filter-column"));
}
