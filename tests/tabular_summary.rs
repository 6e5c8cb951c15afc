use innovation_lab::error::InnovationError;
use innovation_lab::tabular::{ADVISORY, Table, summarize, summarize_csv};

const SALES: &[u8] = b"region,units,price\n\
north,10,2.5\n\
south,20,3.5\n\
east,30,4.5\n\
west,40,5.5\n\
central,50,6.5\n";

#[test]
fn shape_matches_the_file() {
    let summary = summarize_csv(SALES).unwrap();
    assert_eq!((summary.row_count, summary.column_count), (5, 3));
    assert_eq!(
        summary.shape_sentence(),
        "The dataset contains 5 rows and 3 columns."
    );
    assert_eq!(summary.columns_sentence(), "Key columns: region, units, price");
    assert_eq!(summary.advisory, ADVISORY);
}

#[test]
fn text_columns_get_no_statistics() {
    let summary = summarize_csv(SALES).unwrap();
    let names: Vec<&str> = summary.statistics.iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["units", "price"]);

    let units = summary.statistics.get("units").unwrap();
    assert_eq!(units.count, 5.0);
    assert_eq!(units.mean, Some(30.0));
    assert_eq!(units.min, Some(10.0));
    assert_eq!(units.q50, Some(30.0));
    assert_eq!(units.max, Some(50.0));
}

#[test]
fn all_text_table_has_empty_statistics() {
    let summary = summarize_csv(b"name,city\nada,london\nlin,paris\n").unwrap();
    assert!(summary.statistics.is_empty());
    assert_eq!(summary.statistics_json().unwrap(), "{}");
}

#[test]
fn header_only_file_has_zero_rows() {
    let summary = summarize_csv(b"a,b,c\n").unwrap();
    assert_eq!((summary.row_count, summary.column_count), (0, 3));
}

#[test]
fn statistics_json_keeps_column_order() {
    let summary = summarize_csv(b"z,a\n1,2\n3,4\n").unwrap();
    let json = summary.statistics_json().unwrap();
    let z = json.find("\"z\"").unwrap();
    let a = json.find("\"a\"").unwrap();
    assert!(z < a);
}

#[test]
fn preview_is_capped() {
    let table = Table::from_csv_bytes(SALES).unwrap();
    assert_eq!(table.preview(2).len(), 2);
    assert_eq!(table.preview(100).len(), 5);
    assert_eq!(table.preview(2)[1][0], "south");
    assert_eq!(summarize(&table).row_count, 5);
}

#[test]
fn malformed_input_is_a_data_analysis_error() {
    let too_long = summarize_csv(b"a,b\n1,2\n3,4,5\n").unwrap_err();
    assert!(matches!(too_long, InnovationError::DataAnalysis { .. }));
    assert!(too_long.to_string().starts_with("Error analyzing data"));

    let empty = summarize_csv(b"").unwrap_err();
    assert!(matches!(empty, InnovationError::DataAnalysis { .. }));

    let binary = summarize_csv(b"a,b\n\xff\xfe,1\n").unwrap_err();
    assert!(matches!(binary, InnovationError::DataAnalysis { .. }));
}

#[test]
fn short_rows_count_as_missing_values() {
    let summary = summarize_csv(b"a,b\n1,2\n3\n").unwrap();
    assert_eq!((summary.row_count, summary.column_count), (2, 2));
    assert_eq!(summary.statistics.get("a").unwrap().count, 2.0);
    assert_eq!(summary.statistics.get("b").unwrap().count, 1.0);
    assert_eq!(summary.statistics.get("b").unwrap().mean, Some(2.0));
}
