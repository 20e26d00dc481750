#![forbid(unsafe_code)]

use crate::model::NodeId;
use serde::{Deserialize, Serialize};

pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;
pub type Size = euclid::Size2D<f64, Unit>;
pub type Rect = euclid::Rect<f64, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Rect {
    euclid::rect(x, y, width, height)
}

/// Measured bounding box of a node's rendered element, relative to the tracked container.
///
/// Container-relative coordinates keep the value stable under page scrolling: both the element
/// and the container move by the same amount in viewport space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRect {
    pub node_id: NodeId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NodeRect {
    pub fn new(node_id: impl Into<NodeId>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            node_id: node_id.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// Converts a viewport-space element rect into a container-relative `NodeRect`.
    pub fn relative_to(node_id: NodeId, element: Rect, container: Rect) -> Self {
        Self {
            node_id,
            x: element.origin.x - container.origin.x,
            y: element.origin.y - container.origin.y,
            width: element.size.width,
            height: element.size.height,
        }
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        point(self.center_x(), self.center_y())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn left_center(&self) -> Point {
        point(self.x, self.center_y())
    }

    pub fn right_center(&self) -> Point {
        point(self.right(), self.center_y())
    }

    pub fn top_center(&self) -> Point {
        point(self.center_x(), self.y)
    }

    pub fn bottom_center(&self) -> Point {
        point(self.center_x(), self.bottom())
    }

    pub fn as_rect(&self) -> Rect {
        rect(self.x, self.y, self.width, self.height)
    }
}
