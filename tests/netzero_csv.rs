use std::fs;

use iam_netzero::io::{read_frame, read_iamc, write_frame};
use iam_netzero::schema::{data, REFERENCE_YEAR};
use iam_netzero::{get_netzero_data, IamError};
use tempfile::tempdir;

const WIDE: &str = "\
Model,Scenario,Region,Variable,Unit,2030,2040,2050
MESSAGE,SSP1-19,World,Emissions|CO2,Mt CO2/yr,20000,5000,-2000
MESSAGE,SSP1-19,World,Emissions|CH4,Mt CH4/yr,250,180,150
REMIND,SSP2-26,World,Emissions|CO2,Mt CO2/yr,30000,18000,4000
REMIND,SSP2-26,World,Emissions|CH4,Mt CH4/yr,300,260,200
";

const LONG: &str = "\
model,scenario,region,variable,unit,year,value
MESSAGE,SSP1-19,World,Emissions|CH4,Mt CH4/yr,2030,250
MESSAGE,SSP1-19,World,Emissions|CH4,Mt CH4/yr,2040,180
MESSAGE,SSP1-19,World,Emissions|CH4,Mt CH4/yr,2050,150
MESSAGE,SSP1-19,World,Emissions|CO2,Mt CO2/yr,2030,20000
MESSAGE,SSP1-19,World,Emissions|CO2,Mt CO2/yr,2040,5000
MESSAGE,SSP1-19,World,Emissions|CO2,Mt CO2/yr,2050,-2000
REMIND,SSP2-26,World,Emissions|CH4,Mt CH4/yr,2030,300
REMIND,SSP2-26,World,Emissions|CH4,Mt CH4/yr,2040,260
REMIND,SSP2-26,World,Emissions|CH4,Mt CH4/yr,2050,200
REMIND,SSP2-26,World,Emissions|CO2,Mt CO2/yr,2030,30000
REMIND,SSP2-26,World,Emissions|CO2,Mt CO2/yr,2040,18000
REMIND,SSP2-26,World,Emissions|CO2,Mt CO2/yr,2050,4000
";

const META: &str = "\
Model,Scenario,netzero_year,category
MESSAGE,SSP1-19,2045,C1
REMIND,SSP2-26,,C3
";

#[test]
fn wide_and_long_files_load_identically() {
    let dir = tempdir().unwrap();
    let wide = dir.path().join("wide.csv");
    let long = dir.path().join("long.csv");
    fs::write(&wide, WIDE).unwrap();
    fs::write(&long, LONG).unwrap();

    let from_wide = read_iamc(&wide, None).unwrap();
    let from_long = read_iamc(&long, None).unwrap();
    assert!(from_wide.data().equals(from_long.data()));
    assert_eq!(from_wide.years().unwrap(), vec![2030, 2040, 2050]);
}

#[test]
fn netzero_data_from_csv_files() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.csv");
    let meta_path = dir.path().join("meta.csv");
    fs::write(&data_path, WIDE).unwrap();
    fs::write(&meta_path, META).unwrap();

    let frame = read_iamc(&data_path, Some(meta_path.as_path())).unwrap();
    let out = get_netzero_data(&frame, "netzero_year", 2050).unwrap();

    // one row per (model, scenario, variable), all at the reference year
    assert_eq!(out.len(), 4);
    assert_eq!(out.years().unwrap(), vec![REFERENCE_YEAR]);
    assert_eq!(out.index().unwrap(), frame.index().unwrap());

    // MESSAGE interpolated at 2045, REMIND falls back to 2050
    let values: Vec<Option<f64>> = out
        .data()
        .column(data::VALUE)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        values,
        vec![Some(165.0), Some(1500.0), Some(200.0), Some(4000.0)]
    );

    let out_path = dir.path().join("out").join("netzero.csv");
    let mut df = out.data().clone();
    write_frame(&mut df, &out_path).unwrap();

    let written = read_frame(&out_path).unwrap();
    assert_eq!(written.height(), 4);
    let years: Vec<Option<&str>> = written
        .column(data::YEAR)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert!(years.iter().all(|y| *y == Some("0")));
}

#[test]
fn year_before_first_point_fails() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.csv");
    fs::write(&data_path, WIDE).unwrap();

    let frame = read_iamc(&data_path, None).unwrap();
    let meta = polars::df!["model" => &["MESSAGE"], "scenario" => &["SSP1-19"], "nz" => &[2025i64]]
        .unwrap();
    let frame = iam_netzero::IamFrame::new(frame.data().clone(), Some(meta)).unwrap();

    let err = get_netzero_data(&frame, "nz", 2050).unwrap_err();
    assert!(matches!(err, IamError::Interpolation { year: 2025, .. }));
}

#[test]
fn float_formatted_meta_years_are_truncated() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.csv");
    let meta_path = dir.path().join("meta.csv");
    fs::write(
        &data_path,
        "model,scenario,region,variable,unit,2030,2040,2050\n\
         m,a,World,Emissions|CO2,Mt CO2/yr,30,20,10\n\
         m,b,World,Emissions|CO2,Mt CO2/yr,30,20,10\n",
    )
    .unwrap();
    // a float column with a missing cell, as written by pandas
    fs::write(&meta_path, "model,scenario,netzero_year\nm,a,2040.0\nm,b,\n").unwrap();

    let frame = read_iamc(&data_path, Some(meta_path.as_path())).unwrap();
    let out = get_netzero_data(&frame, "netzero_year", 2050).unwrap();

    let values: Vec<Option<f64>> = out
        .data()
        .column(data::VALUE)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(values, vec![Some(20.0), Some(10.0)]);
}
