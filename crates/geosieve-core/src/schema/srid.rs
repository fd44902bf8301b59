/// Geographic (degree-based) reference systems the engine recognizes.
///
/// Buffers on these are computed in the backend's metric CRS and projected
/// back, since a distance in degrees is meaningless.
const GEOGRAPHIC: &[u32] = &[
    4326, // WGS 84
    4258, // ETRS89
    4269, // NAD83
    4283, // GDA94
    4167, // NZGD2000
    4674, // SIRGAS 2000
    4230, // ED50
];

pub fn is_geographic(srid: u32) -> bool {
    GEOGRAPHIC.contains(&srid)
}
