use std::path::Path;

/// Pick the mount point that holds `target`: the longest one that is a
/// path prefix of it.
///
/// Comparison is by whole path components, so `/data` does not claim
/// `/database`.
pub(crate) fn containing_mount<'a, I>(mount_points: I, target: &Path) -> Option<usize>
where
    I: IntoIterator<Item = &'a Path>,
{
    mount_points
        .into_iter()
        .enumerate()
        .filter(|(_, mount)| target.starts_with(mount))
        .max_by_key(|(_, mount)| mount.components().count())
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    static MOUNTS: [&str; 4] = ["/", "/boot", "/srv", "/srv/parcel"];

    #[rstest]
    #[case("/srv/parcel/uploads", Some(3))]
    #[case("/srv/other", Some(2))]
    #[case("/srvx/uploads", Some(0))]
    #[case("/home/op/uploads", Some(0))]
    #[case("/boot", Some(1))]
    fn test_longest_prefix_wins(#[case] target: &str, #[case] expected: Option<usize>) {
        let mounts = MOUNTS.iter().map(Path::new);
        assert_eq!(containing_mount(mounts, Path::new(target)), expected);
    }

    #[test]
    fn test_no_mounts() {
        assert_eq!(containing_mount(std::iter::empty(), Path::new("/srv")), None);
    }

    #[test]
    fn test_relative_target_matches_nothing_absolute() {
        let mounts = MOUNTS.iter().map(Path::new);
        assert_eq!(containing_mount(mounts, Path::new("uploads")), None);
    }
}
