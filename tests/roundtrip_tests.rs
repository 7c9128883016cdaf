//! Export → import round trips through a real workbook file.

use datsheet::config::{ExportOptions, ImportOptions};
use datsheet::dat::parse_objects;
use datsheet::sheet::column_letters;
use datsheet::xlsx::PackageReader;
use datsheet::{Exporter, Importer, Report, WarningCode};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn import_into(workbook: &Path, out: &Path) -> Report {
    Importer::new(ImportOptions {
        output_dir: out.to_path_buf(),
        ..Default::default()
    })
    .import(workbook)
    .unwrap()
}

/// `(key, value)` pairs per object of a file, order-insensitive.
fn object_sets(path: &Path) -> Vec<BTreeSet<(String, String)>> {
    let text = fs::read_to_string(path).unwrap();
    let mut report = Report::default();
    parse_objects(&text, "x", &mut report)
        .into_iter()
        .map(|o| o.params.into_iter().map(|p| (p.key, p.value)).collect())
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// ROUND TRIP
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_round_trip_preserves_objects_files_and_directories() {
    let src = TempDir::new().unwrap();
    write(
        src.path(),
        "vehicles/road/bus.dat",
        "Obj=vehicle\nName=CityBus\n# a comment\nSpeed=80\nintro_year=1950\n---\nobj=vehicle\nname=Coach\nspeed=100\ncost=1.5\n",
    );
    write(
        src.path(),
        "vehicles/road/truck.dat",
        "obj=vehicle\nname=Truck\nwaytype=road\n",
    );
    write(src.path(), "ground.dat", "obj=ground\nname=Outside\n");
    write(src.path(), "ways/rail.dat", "obj=way\nname=Rail\ncost=250\n");

    let wb_dir = TempDir::new().unwrap();
    let workbook = wb_dir.path().join("pak.xlsx");
    let report = Exporter::new(src.path()).export(&workbook).unwrap();
    assert_eq!(report.sheets, 3);
    assert_eq!(report.objects, 5);
    assert_eq!(report.warning_count(), 0);

    let out = TempDir::new().unwrap();
    let report = import_into(&workbook, out.path());
    assert_eq!(report.objects, 5);
    assert_eq!(report.files_written, 4);
    assert_eq!(report.warning_count(), 0);

    for file in [
        "vehicles/road/bus.dat",
        "vehicles/road/truck.dat",
        "ground.dat",
        "ways/rail.dat",
    ] {
        assert_eq!(
            object_sets(&out.path().join(file)),
            object_sets(&src.path().join(file)),
            "{file}"
        );
    }
}

#[test]
fn test_round_trip_comment_text() {
    let src = TempDir::new().unwrap();
    write(src.path(), "a.dat", "name=a\n# hello world\n");

    let wb_dir = TempDir::new().unwrap();
    let workbook = wb_dir.path().join("c.xlsx");
    Exporter::new(src.path()).export(&workbook).unwrap();

    let out = TempDir::new().unwrap();
    import_into(&workbook, out.path());

    let text = fs::read_to_string(out.path().join("a.dat")).unwrap();
    assert!(text.contains("# hello world\n"), "{text}");
}

#[test]
fn test_round_trip_control_characters_and_escape_lookalikes() {
    let src = TempDir::new().unwrap();
    write(
        src.path(),
        "a.dat",
        "name=ctl\u{1}char\nmarker=end\u{1B}[0m\nliteral=_x0041_\n",
    );

    let wb_dir = TempDir::new().unwrap();
    let workbook = wb_dir.path().join("ctl.xlsx");
    Exporter::new(src.path()).export(&workbook).unwrap();

    let strings = PackageReader::open(&workbook)
        .unwrap()
        .read_text("xl/sharedStrings.xml")
        .unwrap();
    assert!(!strings.contains('\u{1}'), "{strings}");
    assert!(!strings.contains('\u{1B}'), "{strings}");
    assert!(strings.contains("ctl_x0001_char"), "{strings}");
    assert!(strings.contains("_x005F_x0041_"), "{strings}");

    let out = TempDir::new().unwrap();
    let report = import_into(&workbook, out.path());
    assert_eq!(report.warning_count(), 0);
    assert_eq!(
        fs::read_to_string(out.path().join("a.dat")).unwrap(),
        "name=ctl\u{1}char\nmarker=end\u{1B}[0m\nliteral=_x0041_\n"
    );
}

#[test]
fn test_round_trip_legacy_encoded_source_becomes_utf8() {
    let src = TempDir::new().unwrap();
    fs::write(src.path().join("s.dat"), b"name=Stra\xDFe\ncopyright=\xA9 me\n").unwrap();

    let wb_dir = TempDir::new().unwrap();
    let workbook = wb_dir.path().join("e.xlsx");
    Exporter::new(src.path()).export(&workbook).unwrap();

    let out = TempDir::new().unwrap();
    import_into(&workbook, out.path());

    assert_eq!(
        fs::read_to_string(out.path().join("s.dat")).unwrap(),
        "name=Straße\ncopyright=© me\n"
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// LAYOUT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_column_assignment_is_deterministic() {
    let src = TempDir::new().unwrap();
    write(src.path(), "a.dat", "name=a\nzeta=1\nalpha=2\n");
    write(src.path(), "b.dat", "name=b\nbeta=x\nzeta=3\n");

    let run = || {
        let mut report = Report::default();
        Exporter::new(src.path())
            .build(&mut report)
            .unwrap()
            .sheets[0]
            .columns
            .clone()
    };
    let first = run();
    assert_eq!(first, run());
    assert_eq!(first, vec!["name", "filename", "zeta", "alpha", "beta"]);
}

#[test]
fn test_wide_sheet_uses_multi_letter_columns() {
    let src = TempDir::new().unwrap();
    let mut text = String::from("name=wide\n");
    for i in 0..40 {
        text.push_str(&format!("key{i:02}={i}\n"));
    }
    write(src.path(), "wide.dat", &text);

    let wb_dir = TempDir::new().unwrap();
    let workbook = wb_dir.path().join("w.xlsx");
    Exporter::new(src.path()).export(&workbook).unwrap();

    let sheet = datsheet::xlsx::read_workbook(&workbook).unwrap();
    assert_eq!(sheet.sheets[0].rows[1].cells.len(), 42);
    assert_eq!(column_letters(41), "AP");

    let out = TempDir::new().unwrap();
    import_into(&workbook, out.path());
    assert_eq!(
        object_sets(&out.path().join("wide.dat")),
        object_sets(&src.path().join("wide.dat"))
    );
}

#[test]
fn test_export_warnings_do_not_fail_the_run() {
    let src = TempDir::new().unwrap();
    write(src.path(), "w.dat", "name=w\nspeed=\nspeed2=1\nspeed2=2\n=orphan\n");
    fs::write(src.path().join("bin.dat"), b"\0\0\0").unwrap();

    let wb_dir = TempDir::new().unwrap();
    let report = Exporter::with_options(
        src.path(),
        ExportOptions {
            title: Some("t".into()),
            ..Default::default()
        },
    )
    .export(wb_dir.path().join("w.xlsx"))
    .unwrap();

    assert_eq!(report.count_code(&WarningCode::NullValue), 1);
    assert_eq!(report.count_code(&WarningCode::Overwritten), 1);
    assert_eq!(report.count_code(&WarningCode::SkippedLine), 1);
    assert_eq!(report.count_code(&WarningCode::Encoding), 1);
    assert_eq!(report.objects, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// APPEND SEMANTICS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_objects_named_alike_share_a_file() {
    let src = TempDir::new().unwrap();
    write(
        src.path(),
        "one.dat",
        "name=foo\nfilename=foo\nspeed=1\n---\nname=foo2\nfilename=foo\nspeed=2\n---\nname=bar\nfilename=bar\n",
    );

    let wb_dir = TempDir::new().unwrap();
    let workbook = wb_dir.path().join("a.xlsx");
    Exporter::new(src.path()).export(&workbook).unwrap();

    let out = TempDir::new().unwrap();
    let report = import_into(&workbook, out.path());

    assert_eq!(
        fs::read_to_string(out.path().join("foo.dat")).unwrap(),
        "name=foo\nspeed=1\n---\nname=foo2\nspeed=2\n"
    );
    assert_eq!(
        fs::read_to_string(out.path().join("bar.dat")).unwrap(),
        "name=bar\n"
    );
    assert!(!out.path().join("one.dat").exists());
    assert_eq!(report.files_written, 2);
}

#[test]
fn test_import_overwrites_existing_files() {
    let src = TempDir::new().unwrap();
    write(src.path(), "x.dat", "name=x\nspeed=5\n");

    let wb_dir = TempDir::new().unwrap();
    let workbook = wb_dir.path().join("o.xlsx");
    Exporter::new(src.path()).export(&workbook).unwrap();

    let out = TempDir::new().unwrap();
    fs::write(out.path().join("x.dat"), "stale content that is much longer\n").unwrap();
    import_into(&workbook, out.path());

    assert_eq!(
        fs::read_to_string(out.path().join("x.dat")).unwrap(),
        "name=x\nspeed=5\n"
    );
}
