//! Spatial value objects: `Geometry` and `Geography`.
//!
//! Payloads are carried opaquely in whichever representation the source
//! provided (WKT, WKB/EWKB, GeoJSON); the original bytes are preserved
//! exactly. The only structural inspection performed is SRID extraction.

use bytes::Bytes;

use crate::error::TypeError;

/// EWKB geometry-type flag marking an embedded SRID.
const EWKB_SRID_FLAG: u32 = 0x2000_0000;

/// The default SRID for geodetic (`Geography`) values: WGS 84.
pub const DEFAULT_GEOGRAPHY_SRID: i32 = 4326;

/// A planar spatial value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Geometry {
    wkt: Option<String>,
    wkb: Option<Bytes>,
    geo_json: Option<String>,
    srid: i32,
}

impl Geometry {
    /// Build a geometry from well-known text.
    ///
    /// An `SRID=NNNN;` prefix (the EWKT convention) is honoured and
    /// stripped from the stored text.
    pub fn from_wkt(wkt: impl Into<String>) -> Result<Self, TypeError> {
        let wkt = wkt.into();
        let trimmed = wkt.trim();
        if trimmed.is_empty() {
            return Err(TypeError::format("WKT geometry", &wkt));
        }
        let (srid, body) = split_ewkt_srid(trimmed)?;
        Ok(Self {
            wkt: Some(body.to_owned()),
            wkb: None,
            geo_json: None,
            srid: srid.unwrap_or(0),
        })
    }

    /// Build a geometry from well-known binary, extracting an embedded
    /// EWKB SRID when present. The input bytes are preserved exactly.
    pub fn from_wkb(wkb: impl Into<Bytes>) -> Result<Self, TypeError> {
        let wkb = wkb.into();
        let srid = extract_ewkb_srid(&wkb)?;
        Ok(Self {
            wkt: None,
            wkb: Some(wkb),
            geo_json: None,
            srid: srid.unwrap_or(0),
        })
    }

    /// Build a geometry from GeoJSON text. A top-level `"srid"` member is
    /// honoured when present (a common provider extension).
    pub fn from_geo_json(json: impl Into<String>) -> Result<Self, TypeError> {
        let json = json.into();
        let value: serde_json::Value = serde_json::from_str(&json)
            .map_err(|_| TypeError::format("GeoJSON geometry", &json))?;
        let srid = value
            .get("srid")
            .and_then(serde_json::Value::as_i64)
            .map(|v| v as i32);
        Ok(Self {
            wkt: None,
            wkb: None,
            geo_json: Some(json),
            srid: srid.unwrap_or(0),
        })
    }

    /// Override the SRID.
    #[must_use]
    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = srid;
        self
    }

    /// The stored well-known text, if this value originated as WKT.
    #[must_use]
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// The stored well-known binary, byte-for-byte as received.
    #[must_use]
    pub fn wkb(&self) -> Option<&Bytes> {
        self.wkb.as_ref()
    }

    /// The stored GeoJSON text, if this value originated as GeoJSON.
    #[must_use]
    pub fn geo_json(&self) -> Option<&str> {
        self.geo_json.as_deref()
    }

    /// The spatial reference identifier. Zero when unknown.
    #[must_use]
    pub fn srid(&self) -> i32 {
        self.srid
    }
}

/// A geodetic spatial value. Identical payload handling to [`Geometry`],
/// except an unknown SRID defaults to WGS 84 (4326).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geography(Geometry);

impl Geography {
    /// Build a geography from well-known text.
    pub fn from_wkt(wkt: impl Into<String>) -> Result<Self, TypeError> {
        Ok(Self(default_srid(Geometry::from_wkt(wkt)?)))
    }

    /// Build a geography from well-known binary.
    pub fn from_wkb(wkb: impl Into<Bytes>) -> Result<Self, TypeError> {
        Ok(Self(default_srid(Geometry::from_wkb(wkb)?)))
    }

    /// Build a geography from GeoJSON text.
    pub fn from_geo_json(json: impl Into<String>) -> Result<Self, TypeError> {
        Ok(Self(default_srid(Geometry::from_geo_json(json)?)))
    }

    /// The underlying payload.
    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.0
    }

    /// The spatial reference identifier; defaults to 4326.
    #[must_use]
    pub fn srid(&self) -> i32 {
        self.0.srid
    }
}

fn default_srid(mut g: Geometry) -> Geometry {
    if g.srid == 0 {
        g.srid = DEFAULT_GEOGRAPHY_SRID;
    }
    g
}

/// Split an optional `SRID=NNNN;` EWKT prefix from WKT text.
fn split_ewkt_srid(wkt: &str) -> Result<(Option<i32>, &str), TypeError> {
    let Some(rest) = wkt
        .strip_prefix("SRID=")
        .or_else(|| wkt.strip_prefix("srid="))
    else {
        return Ok((None, wkt));
    };
    let (num, body) = rest
        .split_once(';')
        .ok_or_else(|| TypeError::format("EWKT SRID prefix", wkt))?;
    let srid: i32 = num
        .trim()
        .parse()
        .map_err(|_| TypeError::format("EWKT SRID prefix", wkt))?;
    Ok((Some(srid), body.trim_start()))
}

/// Extract the SRID embedded in an EWKB payload, if the SRID flag is set.
///
/// Layout: byte 0 is the byte-order mark (0 big-endian, 1 little-endian),
/// bytes 1..5 the geometry type. When `type & 0x2000_0000` is set, the
/// 4 bytes that follow carry the SRID in the same byte order.
fn extract_ewkb_srid(wkb: &[u8]) -> Result<Option<i32>, TypeError> {
    if wkb.len() < 5 {
        return Err(TypeError::InvalidLength {
            what: "WKB geometry",
            expected: "at least 5 bytes",
            actual: wkb.len(),
        });
    }
    let little_endian = match wkb[0] {
        0 => false,
        1 => true,
        _ => return Err(TypeError::format("WKB byte-order mark", "")),
    };
    let type_bytes: [u8; 4] = wkb[1..5].try_into().unwrap_or([0; 4]);
    let geom_type = if little_endian {
        u32::from_le_bytes(type_bytes)
    } else {
        u32::from_be_bytes(type_bytes)
    };
    if geom_type & EWKB_SRID_FLAG == 0 {
        return Ok(None);
    }
    if wkb.len() < 9 {
        return Err(TypeError::InvalidLength {
            what: "EWKB geometry with SRID flag",
            expected: "at least 9 bytes",
            actual: wkb.len(),
        });
    }
    let srid_bytes: [u8; 4] = wkb[5..9].try_into().unwrap_or([0; 4]);
    let srid = if little_endian {
        i32::from_le_bytes(srid_bytes)
    } else {
        i32::from_be_bytes(srid_bytes)
    };
    Ok(Some(srid))
}
