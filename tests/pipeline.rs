use anyhow::Result;
use arrow::array::Array;
use std::{fs, path::Path};
use tempfile::tempdir;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wavejoin::{
    config::StudyConfig,
    discover::Waves,
    output::{read_table, OutputFormat},
    pipeline, report, WaveError,
};

fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,wavejoin=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn write(root: &Path, rel: &str, content: &str) {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, content).unwrap();
}

/// Seven waves laid out like the UKDS tab release, plus a BHPS file that
/// must be ignored. Respondent 1 drops out after wave a, 4 joins in b,
/// 9 only appears in g.
fn seven_wave_tree(root: &Path) {
    let ids_per_wave: [&[i64]; 7] = [
        &[1, 2, 3],
        &[2, 3, 4],
        &[2, 3, 4],
        &[2, 4],
        &[2, 3, 4],
        &[3, 4],
        &[3, 4, 9],
    ];
    for (i, ids) in ids_per_wave.iter().enumerate() {
        let letter = (b'a' + i as u8) as char;
        let mut text = format!(
            "pidp\t{l}_hidp\t{l}_sex\t{l}_dvage\t{l}_vote6\n",
            l = letter
        );
        for id in ids.iter() {
            // sex 1/2, age grows by wave, vote6 missing (-9) for id 2
            let vote = if *id == 2 { -9 } else { 3 };
            text.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                id,
                100 + id,
                1 + id % 2,
                30 + id + i as i64,
                vote
            ));
        }
        write(
            root,
            &format!("UKDA-6614-tab/tab/us_w{}/{}_indresp.tab", i + 1, letter),
            &text,
        );
    }
    write(
        root,
        "UKDA-6614-tab/tab/bhps_w1/ba_indresp.tab",
        "pidp\tba_sex\n1\t1\n",
    );
}

fn config(root: &Path, output: &Path) -> StudyConfig {
    StudyConfig {
        root: root.to_path_buf(),
        variables: vec!["sex".into(), "dvage".into(), "vote6".into()],
        output: output.to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn seven_waves_full_join() -> Result<()> {
    init_test_logging();
    let tmp = tempdir()?;
    seven_wave_tree(tmp.path());
    let out = tmp.path().join("joined.tab");

    let done = pipeline::run(&config(tmp.path(), &out))?;

    // every distinct id across the seven waves
    assert_eq!(done.table.num_rows(), 5);
    let counts: Vec<usize> = done.steps.iter().map(|s| s.accumulated_rows).collect();
    assert_eq!(counts, vec![3, 4, 4, 4, 4, 4, 5]);
    assert_eq!(done.table.num_columns(), 1 + 7 * 3);

    let text = fs::read_to_string(&out)?;
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("pidp\ta_sex\ta_dvage\ta_vote6\tb_sex"));
    assert!(header.ends_with("g_sex\tg_dvage\tg_vote6"));
    assert!(!header.contains("hidp"));
    assert_eq!(lines.count(), 5);

    // id 1: only wave a, id 9: only wave g
    let t = &done.table;
    let r1 = t.position(1).unwrap();
    let r9 = t.position(9).unwrap();
    assert!(t.column("b_sex").unwrap().is_null(r1));
    assert!(t.column("a_sex").unwrap().is_null(r9));
    assert_eq!(t.column("g_dvage").unwrap().value(r9), 45.0);
    // -9 read as missing
    assert!(t.column("a_vote6").unwrap().is_null(t.position(2).unwrap()));

    let manifest: serde_json::Value = serde_json::from_str(&fs::read_to_string(&done.manifest)?)?;
    assert_eq!(manifest["rows"], 5);
    assert_eq!(manifest["waves"].as_array().unwrap().len(), 7);
    assert_eq!(manifest["waves"][6]["letter"], "g");
    Ok(())
}

#[test]
fn rerun_is_byte_identical() -> Result<()> {
    let tmp = tempdir()?;
    seven_wave_tree(tmp.path());
    let out = tmp.path().join("joined.tab");
    let cfg = config(tmp.path(), &out);

    let first = pipeline::run(&cfg)?;
    let table_bytes = fs::read(&out)?;
    let manifest_bytes = fs::read(&first.manifest)?;

    pipeline::run(&cfg)?;
    assert_eq!(table_bytes, fs::read(&out)?);
    assert_eq!(manifest_bytes, fs::read(&first.manifest)?);
    Ok(())
}

#[test]
fn absent_variable_names_wave_and_column() {
    let tmp = tempdir().unwrap();
    seven_wave_tree(tmp.path());
    let mut cfg = config(tmp.path(), &tmp.path().join("joined.tab"));
    cfg.variables = vec!["sex".into(), "height".into()];

    let err = pipeline::run(&cfg).unwrap_err();
    let wave_err = err
        .chain()
        .find_map(|e| e.downcast_ref::<WaveError>())
        .expect("typed error in chain");
    match wave_err {
        WaveError::MissingColumn { origin, column, .. } => {
            assert_eq!(column, "a_height");
            assert_eq!(origin, "wave 1 (a)");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!tmp.path().join("joined.tab").exists());
}

#[test]
fn missing_wave_aborts_before_loading() {
    let tmp = tempdir().unwrap();
    seven_wave_tree(tmp.path());
    fs::remove_file(tmp.path().join("UKDA-6614-tab/tab/us_w4/d_indresp.tab")).unwrap();

    let err = pipeline::run(&config(tmp.path(), &tmp.path().join("joined.tab"))).unwrap_err();
    let wave_err = err.chain().find_map(|e| e.downcast_ref::<WaveError>());
    assert!(matches!(
        wave_err,
        Some(WaveError::MissingWave { index: 4, letter: 'd' })
    ));
}

#[test]
fn two_wave_example_and_summary() -> Result<()> {
    let tmp = tempdir()?;
    write(tmp.path(), "us/a_indresp.tab", "pidp\ta_sex\n1\t1\n2\t2\n3\t1\n");
    write(tmp.path(), "us/b_indresp.tab", "pidp\tb_sex\n2\t2\n3\t1\n4\t2\n");
    let out = tmp.path().join("joined.tab");
    let mut cfg = config(tmp.path(), &out);
    cfg.waves = Waves::parse("ab")?;
    cfg.variables = vec!["sex".into()];

    pipeline::run(&cfg)?;
    assert_eq!(
        fs::read_to_string(&out)?,
        "pidp\ta_sex\tb_sex\n1\t1\t\n2\t2\t2\n3\t1\t1\n4\t\t2\n"
    );

    let back = read_table(&out, "")?;
    let waves = report::waves_in(&back).unwrap();
    let s = report::summarize(&back, &waves)?;
    assert_eq!(s.rows, 4);
    assert_eq!(s.in_all_waves, 2);
    assert_eq!(s.in_one_wave, 2);
    Ok(())
}

#[test]
fn parquet_output_reads_back() -> Result<()> {
    let tmp = tempdir()?;
    seven_wave_tree(tmp.path());
    let out = tmp.path().join("joined.parquet");
    let mut cfg = config(tmp.path(), &out);
    cfg.format = OutputFormat::Parquet;

    let done = pipeline::run(&cfg)?;
    let back = read_table(&out, "")?;
    assert_eq!(back.num_rows(), done.table.num_rows());
    assert_eq!(back.column_names(), done.table.column_names());
    Ok(())
}
