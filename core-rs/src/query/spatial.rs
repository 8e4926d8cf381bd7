/**
 * spatial.rs
 * Bounding-box feature search
 */

use super::assemblers::paginate;
use super::ast::{
    Expression, GroupPattern, Literal, OrderCondition, PropertyPath, Projection, Query,
    SelectQuery, Var,
};
use super::fragments::identified_by;
use super::SparqlQuery;
use crate::errors::{PrezError, Result};
use crate::model::{ItemDescriptor, Pagination};
use crate::vocab;

/// Axis-aligned box in the coordinate order of the stored geometries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let all_finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !all_finite {
            return Err(PrezError::InvalidInput("bbox coordinates must be finite".to_string()));
        }
        if min_x > max_x || min_y > max_y {
            return Err(PrezError::InvalidInput(format!(
                "bbox minimum exceeds maximum: {},{},{},{}",
                min_x, min_y, max_x, max_y
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Parses `minx,miny,maxx,maxy`
    pub fn parse(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(PrezError::InvalidInput(format!(
                "bbox needs four comma separated numbers, got {:?}",
                value
            )));
        }
        let mut numbers = [0f64; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse::<f64>()
                .map_err(|_| PrezError::InvalidInput(format!("bbox coordinate is not a number: {:?}", part)))?;
        }
        Self::new(numbers[0], numbers[1], numbers[2], numbers[3])
    }

    /// Closed counter-clockwise ring starting at the lower-left corner
    pub fn to_wkt_polygon(&self) -> String {
        let (x0, y0, x1, y1) = (self.min_x, self.min_y, self.max_x, self.max_y);
        format!(
            "POLYGON(({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))",
            x0 = x0,
            y0 = y0,
            x1 = x1,
            y1 = y1
        )
    }
}

/// Features of `collection` whose geometry intersects `bbox`
pub fn feature_bbox_select(
    collection: &ItemDescriptor,
    bbox: &BoundingBox,
    pagination: &Pagination,
) -> Result<SparqlQuery> {
    collection.require_identity()?;
    let feature = Var::new("f");
    let id = Var::new("id");
    let wkt = Var::new("wkt");
    let coll = Var::new("coll");

    let mut pattern = GroupPattern::new();
    match collection.uri() {
        Some(uri) => {
            pattern.triple(uri, vocab::RDFS_MEMBER, &feature);
        }
        None => {
            if let Some(collection_id) = collection.id() {
                pattern.extend(identified_by(&coll, collection_id, collection.selected_class()));
            }
            pattern.triple(&coll, vocab::RDFS_MEMBER, &feature);
        }
    }
    pattern
        .triple(&feature, vocab::DCTERMS_IDENTIFIER, &id)
        .triple(
            &feature,
            PropertyPath::sequence([vocab::GEO_HAS_GEOMETRY, vocab::GEO_AS_WKT]),
            &wkt,
        )
        .filter(Expression::Extension(
            vocab::GEO_SF_INTERSECTS.into_owned(),
            vec![
                Expression::var(&wkt),
                Literal::typed(bbox.to_wkt_polygon(), vocab::GEO_WKT_LITERAL).into(),
            ],
        ));

    let mut modifier = paginate(pagination);
    modifier.order_by = vec![OrderCondition::asc(&feature)];
    Ok(SparqlQuery::from_ast(&Query::Select(SelectQuery {
        distinct: true,
        projection: vec![Projection::Var(feature), Projection::Var(id)],
        pattern,
        modifier,
    })))
}
