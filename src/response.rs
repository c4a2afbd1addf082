use std::collections::HashMap;
use std::slice;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{SchemaError, ValueParseError};
use crate::labels::LabelSet;
use crate::series::{TimeSeries, TimeSeriesPoint};

pub type MetricMap = HashMap<LabelSet, TimeSeries>;

// One `[<unix seconds>, "<float>"]` pair as the server sends it. Tuple
// deserialization rejects pairs that are not exactly two elements.
#[derive(Debug, Clone, Deserialize)]
pub struct WireSample(pub f64, pub String);

#[derive(Debug, Clone, Deserialize)]
pub struct VectorEntry {
    pub metric: LabelSet,
    pub value: WireSample,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixEntry {
    pub metric: LabelSet,
    pub values: Vec<WireSample>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "resultType", rename_all = "lowercase")]
pub enum ResultData {
    Vector { result: Vec<VectorEntry> },
    Matrix { result: Vec<MatrixEntry> },
}

impl ResultData {
    // Entries sharing a label set are concatenated into one series, in
    // entry order. The first malformed sample aborts the whole call.
    pub fn to_metric_map(&self) -> Result<MetricMap, ValueParseError> {
        let mut map = MetricMap::new();
        match self {
            ResultData::Vector { result } => {
                for entry in result {
                    append_samples(&mut map, &entry.metric, slice::from_ref(&entry.value))?;
                }
            }
            ResultData::Matrix { result } => {
                for entry in result {
                    append_samples(&mut map, &entry.metric, &entry.values)?;
                }
            }
        }
        Ok(map)
    }
}

fn append_samples(
    map: &mut MetricMap,
    metric: &LabelSet,
    samples: &[WireSample],
) -> Result<(), ValueParseError> {
    let series = map.entry(metric.clone()).or_default();
    for WireSample(ts, raw) in samples {
        series.push(TimeSeriesPoint::from_wire(*ts, raw)?);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    status: String,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

// A validated `status: "success"` envelope; only the data block survives.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub data: ResultData,
}

impl QueryResponse {
    pub fn parse(document: Value) -> Result<Self, SchemaError> {
        let envelope: RawEnvelope = serde_json::from_value(document)
            .map_err(|err| SchemaError::Malformed(err.to_string()))?;

        match envelope.status.as_str() {
            "success" => {}
            "error" => {
                return Err(SchemaError::Server {
                    error_type: envelope.error_type.unwrap_or_default(),
                    message: envelope.error.unwrap_or_default(),
                });
            }
            other => return Err(SchemaError::UnexpectedStatus(other.to_string())),
        }

        let data = envelope.data.ok_or(SchemaError::MissingField("data"))?;
        match data.get("resultType").and_then(Value::as_str) {
            Some("vector") | Some("matrix") => {}
            Some(other) => return Err(SchemaError::UnsupportedResultType(other.to_string())),
            None => return Err(SchemaError::MissingField("resultType")),
        }
        let data =
            serde_json::from_value(data).map_err(|err| SchemaError::Malformed(err.to_string()))?;

        Ok(Self { data })
    }

    pub fn to_metric_map(&self) -> Result<MetricMap, ValueParseError> {
        self.data.to_metric_map()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        pairs.iter().copied().collect()
    }

    #[test]
    fn vector_round_trip_groups_one_entry() {
        let document = json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"job": "x"}, "value": [1680000000.0, "2.5"]}
                ]
            }
        });

        let response = QueryResponse::parse(document).unwrap();
        let map = response.to_metric_map().unwrap();

        assert_eq!(map.len(), 1);
        let series = &map[&labels(&[("job", "x")])];
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 2.5);
        assert_eq!(series[0].timestamp.timestamp(), 1680000000);
    }

    #[test]
    fn matrix_entries_with_identical_labels_concatenate() {
        let document = json!({
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {"metric": {"job": "x"}, "values": [[1, "1.0"]]},
                    {"metric": {"job": "x"}, "values": [[2, "2.0"]]}
                ]
            }
        });

        let map = QueryResponse::parse(document).unwrap().to_metric_map().unwrap();

        assert_eq!(map.len(), 1);
        let series = &map[&labels(&[("job", "x")])];
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].value, 1.0);
        assert_eq!(series[1].value, 2.0);
    }

    #[test]
    fn matrix_preserves_sample_order_within_an_entry() {
        let document = json!({
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {"metric": {}, "values": [[3, "3.0"], [1, "1.0"], [2, "2.0"]]}
                ]
            }
        });

        let map = QueryResponse::parse(document).unwrap().to_metric_map().unwrap();
        let series = &map[&LabelSet::default()];
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn distinct_label_sets_get_distinct_series() {
        let document = json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"job": "x"}, "value": [1, "1.0"]},
                    {"metric": {"job": "y"}, "value": [1, "2.0"]}
                ]
            }
        });

        let map = QueryResponse::parse(document).unwrap().to_metric_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&labels(&[("job", "x")])][0].value, 1.0);
        assert_eq!(map[&labels(&[("job", "y")])][0].value, 2.0);
    }

    #[test]
    fn scalar_result_type_is_rejected() {
        let document = json!({
            "status": "success",
            "data": {"resultType": "scalar", "result": [1680000000.0, "1"]}
        });

        assert!(matches!(
            QueryResponse::parse(document),
            Err(SchemaError::UnsupportedResultType(kind)) if kind == "scalar"
        ));
    }

    #[test]
    fn missing_data_block_is_rejected() {
        let document = json!({"status": "success"});
        assert!(matches!(
            QueryResponse::parse(document),
            Err(SchemaError::MissingField("data"))
        ));
    }

    #[test]
    fn missing_result_type_is_rejected() {
        let document = json!({"status": "success", "data": {"result": []}});
        assert!(matches!(
            QueryResponse::parse(document),
            Err(SchemaError::MissingField("resultType"))
        ));
    }

    #[test]
    fn error_status_surfaces_the_server_message() {
        let document = json!({
            "status": "error",
            "errorType": "bad_data",
            "error": "invalid parameter \"query\""
        });

        match QueryResponse::parse(document) {
            Err(SchemaError::Server {
                error_type,
                message,
            }) => {
                assert_eq!(error_type, "bad_data");
                assert_eq!(message, "invalid parameter \"query\"");
            }
            other => panic!("expected a server error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let document = json!({"status": "partial", "data": {"resultType": "vector", "result": []}});
        assert!(matches!(
            QueryResponse::parse(document),
            Err(SchemaError::UnexpectedStatus(status)) if status == "partial"
        ));
    }

    #[test]
    fn value_pair_with_wrong_arity_is_rejected() {
        let document = json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [{"metric": {}, "value": [1680000000.0]}]
            }
        });
        assert!(matches!(
            QueryResponse::parse(document),
            Err(SchemaError::Malformed(_))
        ));

        let document = json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [{"metric": {}, "value": [1680000000.0, "1", "extra"]}]
            }
        });
        assert!(matches!(
            QueryResponse::parse(document),
            Err(SchemaError::Malformed(_))
        ));
    }

    #[test]
    fn missing_metric_field_is_rejected() {
        let document = json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [{"value": [1680000000.0, "1"]}]
            }
        });
        assert!(matches!(
            QueryResponse::parse(document),
            Err(SchemaError::Malformed(_))
        ));
    }

    #[test]
    fn malformed_sample_fails_the_whole_grouping() {
        let document = json!({
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {"metric": {"job": "x"}, "values": [[1, "1.0"], [2, "not-a-number"]]}
                ]
            }
        });

        let response = QueryResponse::parse(document).unwrap();
        assert_eq!(
            response.to_metric_map(),
            Err(ValueParseError::Value("not-a-number".to_string()))
        );
    }

    #[test]
    fn to_metric_map_is_idempotent() {
        let document = json!({
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {"metric": {"job": "x"}, "values": [[1, "1.0"], [2, "2.0"]]},
                    {"metric": {"job": "y"}, "values": [[1, "3.0"]]}
                ]
            }
        });

        let response = QueryResponse::parse(document).unwrap();
        let first = response.to_metric_map().unwrap();
        let second = response.to_metric_map().unwrap();
        assert_eq!(first, second);
    }
}
