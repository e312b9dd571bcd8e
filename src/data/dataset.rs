use serde::{Serialize, Deserialize};

use crate::data::iris::FISHER;
use crate::error::{Error, Result};

/// One labelled training row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub input: Vec<f32>,
    /// Expected network output (one-hot for classification).
    pub target: Vec<f32>,
    /// Class index; for the logical function this is the expected bit.
    pub label: usize,
}

/// An ordered, immutable set of examples shared by reference between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub examples: Vec<Example>,
    /// Number of classes; `outputs` of the network that fits this data.
    pub classes: usize,
}

impl Dataset {
    /// Validates that every row has the same input and target width and a
    /// label within range.
    pub fn new(name: impl Into<String>, examples: Vec<Example>, classes: usize) -> Result<Dataset> {
        let name = name.into();
        let first = examples
            .first()
            .ok_or_else(|| Error::InvalidData(format!("dataset {name} has no examples")))?;
        let (inputs, outputs) = (first.input.len(), first.target.len());
        if inputs == 0 || outputs == 0 {
            return Err(Error::InvalidData(format!("dataset {name} has zero-width rows")));
        }

        for (i, example) in examples.iter().enumerate() {
            if example.input.len() != inputs || example.target.len() != outputs {
                return Err(Error::InvalidData(format!(
                    "row {i} of {name} is {}->{}, expected {inputs}->{outputs}",
                    example.input.len(),
                    example.target.len()
                )));
            }
            if example.label >= classes {
                return Err(Error::InvalidData(format!(
                    "row {i} of {name} has label {} but only {classes} classes",
                    example.label
                )));
            }
        }

        Ok(Dataset { name, examples, classes })
    }

    /// The two-input exclusive-or truth table.
    pub fn xor() -> Dataset {
        let rows = [([0.0, 0.0], 0), ([1.0, 0.0], 1), ([0.0, 1.0], 1), ([1.0, 1.0], 0)];
        let examples = rows
            .iter()
            .map(|&(input, label)| Example {
                input: input.to_vec(),
                target: vec![label as f32],
                label,
            })
            .collect();
        Dataset { name: "xor".into(), examples, classes: 2 }
    }

    /// Fisher's iris data with every measurement divided by the largest
    /// measurement in the table, so all inputs fall in (0, 1].
    pub fn iris() -> Dataset {
        let max = FISHER
            .iter()
            .flat_map(|(measures, _)| measures.iter().copied())
            .fold(0.0f64, f64::max);

        let examples = FISHER
            .iter()
            .map(|(measures, label)| {
                let mut target = vec![0.0; 3];
                target[*label] = 1.0;
                Example {
                    input: measures.iter().map(|m| (m / max) as f32).collect(),
                    target,
                    label: *label,
                }
            })
            .collect();
        Dataset { name: "iris".into(), examples, classes: 3 }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn input_width(&self) -> usize {
        self.examples.first().map_or(0, |e| e.input.len())
    }

    pub fn output_width(&self) -> usize {
        self.examples.first().map_or(0, |e| e.target.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iris_is_normalised_and_balanced() {
        let iris = Dataset::iris();
        assert_eq!(iris.len(), 150);
        assert_eq!((iris.input_width(), iris.output_width()), (4, 3));
        assert!(iris.examples.iter().flat_map(|e| e.input.iter()).all(|&x| x > 0.0 && x <= 1.0));
        for class in 0..3 {
            assert_eq!(iris.examples.iter().filter(|e| e.label == class).count(), 50);
        }
        // 7.9 cm is the largest measurement.
        assert!(iris.examples.iter().any(|e| e.input[0] == 1.0));
    }

    #[test]
    fn xor_truth_table() {
        let xor = Dataset::xor();
        let expected: Vec<usize> = xor
            .examples
            .iter()
            .map(|e| (e.input[0] as usize) ^ (e.input[1] as usize))
            .collect();
        let labels: Vec<usize> = xor.examples.iter().map(|e| e.label).collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let rows = vec![
            Example { input: vec![0.0, 1.0], target: vec![1.0], label: 1 },
            Example { input: vec![0.0], target: vec![1.0], label: 1 },
        ];
        assert!(matches!(Dataset::new("bad", rows, 2), Err(Error::InvalidData(_))));
        assert!(matches!(Dataset::new("empty", vec![], 2), Err(Error::InvalidData(_))));
    }
}
