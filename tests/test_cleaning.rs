//! Integration test: properties of the cleaning pipeline

use mycsv_automl::autopipeline::AutoPipeline;
use mycsv_automl::cleaning::{CleaningConfig, DataCleaner};
use mycsv_automl::utils::frame::row_keys;
use polars::prelude::*;
use std::collections::HashSet;

fn messy_dataset() -> DataFrame {
    DataFrame::new(vec![
        Column::new("id".into(), &[1i64, 2, 2, 3, 4, 5, 6, 7, 8, 9]),
        Column::new(
            "joined".into(),
            &[
                Some("2021-03-01"),
                Some("03/02/2021"),
                Some("03/02/2021"),
                Some("2021-03-04"),
                Some("not a date"),
                Some("March 6, 2021"),
                Some("2021/03/07"),
                Some("2021-03-08"),
                None,
                Some("2021-03-10"),
            ],
        ),
        Column::new(
            "score".into(),
            &[Some(1.5), None, None, Some(3.0), Some(2.0), None, Some(7.5), Some(4.0), Some(1.0), Some(6.0)],
        ),
        Column::new(
            "mostly_empty".into(),
            &[None, None, None, Some(1i64), None, None, Some(2), None, None, None],
        ),
        Column::new(
            "team".into(),
            &["red", "blue", "blue", "red", "red", "NA", "blue", "red", "blue", "red"],
        ),
    ])
    .unwrap()
}

#[test]
fn test_cleaning_is_idempotent() {
    let cleaner = DataCleaner::default();
    let once = cleaner.clean(messy_dataset()).unwrap();
    let twice = cleaner.clean(once.data.clone()).unwrap();

    assert!(once.data.equals_missing(&twice.data));
    assert_eq!(twice.report.duplicates_removed, 0);
    assert_eq!(twice.report.rows_dropped_by_dates, 0);
    assert!(twice.report.imputed_cells.is_empty());
}

#[test]
fn test_reformatted_dates_do_not_leave_duplicates() {
    let df = df!(
        "when" => &["2023-01-05", "01/05/2023", "2023-01-06", "2023-01-07"],
        "v" => &[1, 1, 2, 3]
    )
    .unwrap();
    let cleaner = DataCleaner::default();
    let once = cleaner.clean(df).unwrap();

    let keys = row_keys(&once.data).unwrap();
    let distinct: HashSet<&String> = keys.iter().collect();
    assert_eq!(distinct.len(), keys.len());
    assert_eq!(once.data.height(), 3);

    let twice = cleaner.clean(once.data.clone()).unwrap();
    assert!(once.data.equals_missing(&twice.data));
    assert_eq!(twice.report.duplicates_after_rewrite, 0);
}

#[test]
fn test_pruning_bounds() {
    let out = DataCleaner::default().clean(messy_dataset()).unwrap();
    let height = out.data.height();
    assert!(height > 0);

    for col in out.data.get_columns() {
        assert!(col.null_count() as f64 / height as f64 <= 0.4, "{}", col.name());
    }
    assert!(out.report.dropped_columns.contains(&"mostly_empty".to_string()));
}

#[test]
fn test_dates_normalized_and_bad_rows_removed() {
    let out = DataCleaner::default().clean(messy_dataset()).unwrap();
    // duplicate id=2 row, "not a date" and the missing date are gone
    assert_eq!(out.report.duplicates_removed, 1);
    assert_eq!(out.report.rows_dropped_by_dates, 2);
    assert_eq!(out.data.height(), 7);

    let joined = out.data.column("joined").unwrap().str().unwrap().clone();
    let values: Vec<&str> = joined.into_iter().flatten().collect();
    assert_eq!(
        values,
        vec!["2021-03-01", "2021-03-02", "2021-03-04", "2021-03-06", "2021-03-07", "2021-03-08", "2021-03-10"]
    );
}

#[test]
fn test_dedup_rows_come_from_input() {
    let df = df!(
        "a" => &[1, 2, 1, 3, 2, 4],
        "b" => &["p", "q", "p", "r", "q", "s"]
    )
    .unwrap();
    let input_keys: HashSet<String> = row_keys(&df).unwrap().into_iter().collect();

    let out = DataCleaner::default().clean(df).unwrap();
    let output_keys = row_keys(&out.data).unwrap();
    let distinct: HashSet<&String> = output_keys.iter().collect();

    assert_eq!(distinct.len(), output_keys.len());
    assert!(output_keys.iter().all(|k| input_keys.contains(k)));
    assert_eq!(out.data.height(), 4);
}

#[test]
fn test_rare_missing_rows_leave_no_gaps() {
    let values: Vec<Option<f64>> = (0..30).map(|i| if i == 11 || i == 23 { None } else { Some(i as f64) }).collect();
    let df = DataFrame::new(vec![
        Column::new("id".into(), (0..30i64).collect::<Vec<_>>()),
        Column::new("v".into(), values),
    ])
    .unwrap();

    let out = DataCleaner::default().clean(df).unwrap();
    assert_eq!(out.report.rows_dropped_missing, 2);
    assert!(out.data.get_columns().iter().all(|c| c.null_count() == 0));
}

#[test]
fn test_latin1_bytes_are_decoded() {
    let mut bytes = b"name,city,visits\n".to_vec();
    for (name, city, visits) in [
        (&b"Jos\xe9"[..], &b"M\xe1laga"[..], "3"),
        (b"Ana", b"C\xe1diz", "5"),
        (b"Lu\xeds", b"Le\xf3n", "2"),
        (b"In\xe9s", b"Ja\xe9n", "7"),
        (b"Mar\xeda", b"C\xf3rdoba", "4"),
        (b"Ram\xf3n", b"\xc1vila", "1"),
    ] {
        bytes.extend_from_slice(name);
        bytes.push(b',');
        bytes.extend_from_slice(city);
        bytes.push(b',');
        bytes.extend_from_slice(visits.as_bytes());
        bytes.push(b'\n');
    }

    let (csv, report) = AutoPipeline::default().clean_bytes(&bytes).unwrap();
    assert_eq!(report.rows_out, 6);
    let text = String::from_utf8(csv).unwrap();
    assert!(text.contains("José"));
    assert!(text.contains("Málaga"));
}

#[test]
fn test_allow_list_and_clean_columns_together() {
    let config = CleaningConfig::new()
        .with_columns(vec!["score".into(), "id".into()])
        .with_columns_to_clean(vec!["id".into()]);
    let out = DataCleaner::new(config).clean(messy_dataset()).unwrap();

    assert_eq!(out.data.width(), 2);
    assert_eq!(out.data.get_column_names()[0].as_str(), "score");
    // score is outside the clean list, so its gaps survive
    assert!(out.data.column("score").unwrap().null_count() > 0);
}
