/// GPS coordinate resolution from EXIF GPS tags
///
/// decimal = degrees + minutes / 60 + seconds / 3600, each component taken as
/// numerator / denominator in f64, negated for the S and W hemispheres.
use exif::Value;
use serde::Serialize;

/// Raw values of the four GPS tags the resolver needs
#[derive(Debug, Clone, Default)]
pub struct GpsTags {
    pub latitude: Option<Value>,
    pub latitude_ref: Option<Value>,
    pub longitude: Option<Value>,
    pub longitude_ref: Option<Value>,
}

/// Outcome of resolving the GPS tags of one image
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GpsStatus {
    Resolved { latitude: f64, longitude: f64 },
    /// One or more of the four tags is absent
    Unavailable,
    /// Tags are present but cannot be interpreted
    Malformed { reason: String },
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn name(self) -> &'static str {
        match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        }
    }

    fn limit(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    /// Sign for a hemisphere letter valid on this axis
    fn sign(self, hemisphere: &str) -> Option<f64> {
        match (self, hemisphere.to_ascii_uppercase().as_str()) {
            (Axis::Latitude, "N") | (Axis::Longitude, "E") => Some(1.0),
            (Axis::Latitude, "S") | (Axis::Longitude, "W") => Some(-1.0),
            _ => None,
        }
    }
}

/// Resolve signed decimal degrees. Never fails: problems become status values.
pub fn resolve(tags: &GpsTags) -> GpsStatus {
    let (Some(lat), Some(lat_ref), Some(lon), Some(lon_ref)) = (
        &tags.latitude,
        &tags.latitude_ref,
        &tags.longitude,
        &tags.longitude_ref,
    ) else {
        return GpsStatus::Unavailable;
    };

    let latitude = signed_degrees(lat, lat_ref, Axis::Latitude);
    let longitude = signed_degrees(lon, lon_ref, Axis::Longitude);

    match (latitude, longitude) {
        (Ok(latitude), Ok(longitude)) => GpsStatus::Resolved {
            latitude,
            longitude,
        },
        (Err(reason), _) | (_, Err(reason)) => {
            tracing::warn!("Malformed GPS tags: {}", reason);
            GpsStatus::Malformed { reason }
        }
    }
}

fn signed_degrees(value: &Value, reference: &Value, axis: Axis) -> Result<f64, String> {
    let hemisphere = hemisphere_letter(reference)
        .ok_or_else(|| format!("{} reference is not ASCII text", axis.name()))?;
    let sign = axis
        .sign(&hemisphere)
        .ok_or_else(|| format!("invalid {} reference {:?}", axis.name(), hemisphere))?;

    let decimal = dms_to_decimal(value).map_err(|e| format!("{}: {}", axis.name(), e))?;
    if !(0.0..=axis.limit()).contains(&decimal) {
        return Err(format!(
            "{} {} out of range 0..={}",
            axis.name(),
            decimal,
            axis.limit()
        ));
    }

    // 0°0'0" S/W is the equator or meridian, not -0.0
    if decimal == 0.0 {
        return Ok(0.0);
    }
    Ok(sign * decimal)
}

fn hemisphere_letter(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => {
            let first = parts.first()?;
            let text = std::str::from_utf8(first).ok()?;
            Some(text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
        }
        _ => None,
    }
}

/// Degrees/minutes/seconds rational triple to decimal degrees
pub fn dms_to_decimal(value: &Value) -> Result<f64, String> {
    let Value::Rational(parts) = value else {
        return Err("expected a rational triple".to_string());
    };
    if parts.len() != 3 {
        return Err(format!("expected 3 components, found {}", parts.len()));
    }

    let mut components = [0.0f64; 3];
    for (slot, (part, label)) in components
        .iter_mut()
        .zip(parts.iter().zip(["degrees", "minutes", "seconds"]))
    {
        if part.denom == 0 {
            return Err(format!("zero denominator in {}", label));
        }
        *slot = part.num as f64 / part.denom as f64;
    }

    let [degrees, minutes, seconds] = components;
    Ok(degrees + minutes / 60.0 + seconds / 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::Rational;

    fn triple(d: (u32, u32), m: (u32, u32), s: (u32, u32)) -> Value {
        Value::Rational(vec![
            Rational { num: d.0, denom: d.1 },
            Rational { num: m.0, denom: m.1 },
            Rational { num: s.0, denom: s.1 },
        ])
    }

    fn ascii(s: &str) -> Value {
        Value::Ascii(vec![s.as_bytes().to_vec()])
    }

    fn tags(lat_ref: &str, lon_ref: &str) -> GpsTags {
        GpsTags {
            latitude: Some(triple((40, 1), (26, 1), (46, 1))),
            latitude_ref: Some(ascii(lat_ref)),
            longitude: Some(triple((79, 1), (58, 1), (56, 1))),
            longitude_ref: Some(ascii(lon_ref)),
        }
    }

    #[test]
    fn test_north_east_positive() {
        let GpsStatus::Resolved { latitude, longitude } = resolve(&tags("N", "E")) else {
            panic!("expected resolved coordinates");
        };
        assert!((latitude - 40.446111).abs() < 1e-6, "got {}", latitude);
        assert!((longitude - 79.982222).abs() < 1e-6, "got {}", longitude);
    }

    #[test]
    fn test_south_west_negative() {
        let GpsStatus::Resolved { latitude, longitude } = resolve(&tags("S", "W")) else {
            panic!("expected resolved coordinates");
        };
        assert!((latitude + 40.446111).abs() < 1e-6, "got {}", latitude);
        assert!((longitude + 79.982222).abs() < 1e-6, "got {}", longitude);
    }

    #[test]
    fn test_exact_formula() {
        let value = triple((40, 1), (26, 1), (4630, 100));
        assert_eq!(
            dms_to_decimal(&value).unwrap(),
            40.0 + 26.0 / 60.0 + 46.3 / 3600.0
        );
    }

    #[test]
    fn test_missing_longitude_is_unavailable() {
        let mut only_latitude = tags("N", "E");
        only_latitude.longitude = None;
        only_latitude.longitude_ref = None;

        assert_eq!(resolve(&only_latitude), GpsStatus::Unavailable);
        assert_eq!(resolve(&GpsTags::default()), GpsStatus::Unavailable);
    }

    #[test]
    fn test_zero_denominator_is_malformed() {
        let mut broken = tags("N", "E");
        broken.latitude = Some(triple((40, 1), (26, 0), (46, 1)));

        match resolve(&broken) {
            GpsStatus::Malformed { reason } => assert!(reason.contains("minutes"), "{}", reason),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_reference_is_malformed() {
        assert!(matches!(
            resolve(&tags("E", "E")),
            GpsStatus::Malformed { .. }
        ));
        assert!(matches!(
            resolve(&tags("N", "Q")),
            GpsStatus::Malformed { .. }
        ));
    }

    #[test]
    fn test_non_rational_is_malformed() {
        let mut broken = tags("N", "E");
        broken.longitude = Some(Value::Short(vec![79, 58, 56]));
        assert!(matches!(resolve(&broken), GpsStatus::Malformed { .. }));

        assert!(dms_to_decimal(&Value::Rational(vec![Rational { num: 1, denom: 1 }])).is_err());
    }

    #[test]
    fn test_zero_south_west_is_unsigned() {
        let origin = GpsTags {
            latitude: Some(triple((0, 1), (0, 1), (0, 1))),
            latitude_ref: Some(ascii("S")),
            longitude: Some(triple((0, 1), (0, 1), (0, 1))),
            longitude_ref: Some(ascii("W")),
        };
        let GpsStatus::Resolved { latitude, longitude } = resolve(&origin) else {
            panic!("expected resolved coordinates");
        };
        assert!(latitude.is_sign_positive());
        assert!(longitude.is_sign_positive());
        assert_eq!(format!("{:.6}, {:.6}", latitude, longitude), "0.000000, 0.000000");
    }

    #[test]
    fn test_out_of_range_is_malformed() {
        let mut broken = tags("N", "E");
        broken.latitude = Some(triple((91, 1), (0, 1), (0, 1)));
        assert!(matches!(resolve(&broken), GpsStatus::Malformed { .. }));
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let json = serde_json::to_value(GpsStatus::Unavailable).unwrap();
        assert_eq!(json["status"], "unavailable");
    }
}
