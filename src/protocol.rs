//! Seldon-style JSON messages shared by the server and the clients

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::tensor::Tensor;
use crate::error::{HousingError, Result};

/// `{"data": {"ndarray": [[...]], "names": [...]}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub data: NdArrayData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NdArrayData {
    pub ndarray: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
}

impl PredictRequest {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self {
            data: NdArrayData {
                ndarray: rows,
                names: None,
            },
        }
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.data.names = Some(names);
        self
    }

    /// Rows as a matrix; ragged rows are rejected
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let rows = &self.data.ndarray;
        let width = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(HousingError::ShapeError {
                expected: format!("{} values per row", width),
                actual: format!("{} values in row {}", row.len(), i),
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Ok(Array2::from_shape_vec((rows.len(), width), flat)?)
    }
}

/// `{"data": {"names": ["price"], "ndarray": [...]}, "meta": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub data: PredictionData,
    #[serde(default)]
    pub meta: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionData {
    pub names: Vec<String>,
    pub ndarray: Vec<f64>,
}

/// `{"binData": "<base64>"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinDataRequest {
    #[serde(rename = "binData")]
    pub bin_data: String,
}

/// `{"data": {"tensor": {"shape": [...], "values": [...]}}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorResponse {
    pub data: TensorData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorData {
    pub tensor: Tensor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let req = PredictRequest::new(vec![vec![1.0, 2.0]]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"data": {"ndarray": [[1.0, 2.0]]}}));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let req = PredictRequest::new(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(req.to_array().is_err());
    }

    #[test]
    fn test_to_array() {
        let req: PredictRequest =
            serde_json::from_str(r#"{"data":{"ndarray":[[1,2],[3,4]],"names":["a","b"]}}"#).unwrap();
        let x = req.to_array().unwrap();
        assert_eq!(x.dim(), (2, 2));
        assert_eq!(x[[1, 0]], 3.0);
        assert_eq!(req.data.names.unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_tensor_response_parse() {
        let resp: TensorResponse =
            serde_json::from_str(r#"{"data":{"tensor":{"shape":[1,1,3],"values":[1,2,3]}}}"#).unwrap();
        assert_eq!(resp.data.tensor.shape, vec![1, 1, 3]);
    }
}
