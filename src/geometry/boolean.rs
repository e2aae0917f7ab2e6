// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean operators and the fragment keep/discard table

use super::classification::FragmentSide;
use crate::error::CsgError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOp {
    /// A ∪ B
    Union,
    /// A − B
    Subtraction,
    /// A ∩ B
    Intersection,
}

impl BooleanOp {
    pub const ALL: [BooleanOp; 3] = [
        BooleanOp::Union,
        BooleanOp::Subtraction,
        BooleanOp::Intersection,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BooleanOp::Union => "union",
            BooleanOp::Subtraction => "subtraction",
            BooleanOp::Intersection => "intersection",
        }
    }
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BooleanOp {
    type Err = CsgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" | "addition" => Ok(BooleanOp::Union),
            "subtraction" | "difference" | "subtract" => Ok(BooleanOp::Subtraction),
            "intersection" | "intersect" => Ok(BooleanOp::Intersection),
            _ => Err(CsgError::UnsupportedOperator(s.to_string())),
        }
    }
}

/// What to do with a classified fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentAction {
    Discard,
    Keep,
    /// Keep with reversed winding and negated normals
    KeepInverted,
}

/// Keep/discard decision for a fragment of operand A (`from_b == false`)
/// or operand B.
///
/// Shared coplanar faces are emitted once, from A. B's coplanar fragments
/// are always dropped.
pub fn fragment_action(op: BooleanOp, side: FragmentSide, from_b: bool) -> FragmentAction {
    use FragmentAction::*;
    use FragmentSide::*;

    match (op, from_b, side) {
        (_, true, CoplanarAligned | CoplanarOpposite) => Discard,

        (BooleanOp::Union, false, Outside | CoplanarAligned) => Keep,
        (BooleanOp::Union, true, Outside) => Keep,

        (BooleanOp::Subtraction, false, Outside | CoplanarOpposite) => Keep,
        (BooleanOp::Subtraction, true, Inside) => KeepInverted,

        (BooleanOp::Intersection, false, Inside | CoplanarAligned) => Keep,
        (BooleanOp::Intersection, true, Inside) => Keep,

        _ => Discard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operator_names() {
        assert_eq!("union".parse::<BooleanOp>().unwrap(), BooleanOp::Union);
        assert_eq!("Difference".parse::<BooleanOp>().unwrap(), BooleanOp::Subtraction);
        assert_eq!(" intersect ".parse::<BooleanOp>().unwrap(), BooleanOp::Intersection);

        let err = "xor".parse::<BooleanOp>().unwrap_err();
        assert_eq!(err, CsgError::UnsupportedOperator("xor".to_string()));
    }

    #[test]
    fn test_display_round_trips() {
        for op in BooleanOp::ALL {
            assert_eq!(op.to_string().parse::<BooleanOp>().unwrap(), op);
        }
    }

    #[test]
    fn test_subtraction_table() {
        let op = BooleanOp::Subtraction;
        assert_eq!(fragment_action(op, FragmentSide::Outside, false), FragmentAction::Keep);
        assert_eq!(fragment_action(op, FragmentSide::Inside, false), FragmentAction::Discard);
        assert_eq!(
            fragment_action(op, FragmentSide::CoplanarOpposite, false),
            FragmentAction::Keep
        );
        assert_eq!(
            fragment_action(op, FragmentSide::CoplanarAligned, false),
            FragmentAction::Discard
        );
        assert_eq!(fragment_action(op, FragmentSide::Inside, true), FragmentAction::KeepInverted);
        assert_eq!(fragment_action(op, FragmentSide::Outside, true), FragmentAction::Discard);
    }

    #[test]
    fn test_coplanar_b_fragments_are_dropped() {
        for op in BooleanOp::ALL {
            for side in [FragmentSide::CoplanarAligned, FragmentSide::CoplanarOpposite] {
                assert_eq!(fragment_action(op, side, true), FragmentAction::Discard);
            }
        }
    }

    #[test]
    fn test_union_and_intersection_are_complementary_on_a() {
        for side in [FragmentSide::Inside, FragmentSide::Outside] {
            let union = fragment_action(BooleanOp::Union, side, false);
            let intersection = fragment_action(BooleanOp::Intersection, side, false);
            assert_ne!(union, intersection);
        }
    }
}
