//! Tests for template parsing and validation
//!
//! The fixtures here are shared with the transform tests.


use super::Template;

/// Surface observation template: position, date, pressure and temperature
pub const SURFACE_TEMPLATE: &str = r##"{
    "inputShortDelayedDescriptorReplicationFactor": [],
    "inputDelayedDescriptorReplicationFactor": [],
    "inputExtendedDelayedDescriptorReplicationFactor": [],
    "wigos_station_identifier": "const:0-1-2-ABCD",
    "number_header_rows": 1,
    "column_names_row": 1,
    "header": [
        {"eccodes_key": "edition", "value": "const:4"},
        {"eccodes_key": "masterTableNumber", "value": "const:0"},
        {"eccodes_key": "bufrHeaderCentre", "value": "const:0"},
        {"eccodes_key": "bufrHeaderSubCentre", "value": "const:0"},
        {"eccodes_key": "updateSequenceNumber", "value": "const:0"},
        {"eccodes_key": "dataCategory", "value": "const:0"},
        {"eccodes_key": "internationalDataSubCategory", "value": "const:6"},
        {"eccodes_key": "masterTablesVersionNumber", "value": "const:36"},
        {"eccodes_key": "numberOfSubsets", "value": "const:1"},
        {"eccodes_key": "observedData", "value": "const:1"},
        {"eccodes_key": "compressedData", "value": "const:0"},
        {"eccodes_key": "typicalYear", "value": "data:year"},
        {"eccodes_key": "typicalMonth", "value": "data:month"},
        {"eccodes_key": "typicalDay", "value": "data:day"},
        {"eccodes_key": "typicalHour", "value": "data:hour"},
        {"eccodes_key": "typicalMinute", "value": "data:minute"},
        {"eccodes_key": "unexpandedDescriptors", "value": "array:301021, 301011, 301012, 10051, 12101"}
    ],
    "data": [
        {"eccodes_key": "#1#year", "value": "data:year"},
        {"eccodes_key": "#1#month", "value": "data:month"},
        {"eccodes_key": "#1#day", "value": "data:day"},
        {"eccodes_key": "#1#hour", "value": "data:hour"},
        {"eccodes_key": "#1#minute", "value": "data:minute"},
        {"eccodes_key": "#1#latitude", "value": "data:latitude", "valid_min": "const:-90.0", "valid_max": "const:90.0"},
        {"eccodes_key": "#1#longitude", "value": "data:longitude", "valid_min": "const:-180.0", "valid_max": "const:180.0"},
        {"eccodes_key": "#1#pressureReducedToMeanSeaLevel", "value": "data:pressure"},
        {"eccodes_key": "#1#airTemperature", "value": "data:air_temperature"}
    ]
}"##;

pub const SURFACE_HEADER: &str =
    "\"air_temperature\",\"pressure\",\"latitude\",\"longitude\",\"year\",\"month\",\"day\",\"hour\",\"minute\"";

pub const SURFACE_ROW: &str = "290.31,100130,55.154,0.0,2021,11,18,18,0";

pub fn surface_template() -> Template {
    Template::from_json(SURFACE_TEMPLATE).expect("fixture template is valid")
}

/// CSV text with the surface header and the given data lines
pub fn surface_csv(rows: &[&str]) -> String {
    let mut csv = String::from(SURFACE_HEADER);
    for row in rows {
        csv.push('\n');
        csv.push_str(row);
    }
    csv.push('\n');
    csv
}
