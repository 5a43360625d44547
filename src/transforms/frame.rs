use std::collections::BTreeMap;

use glam::DMat4;

/// One record of a stored chain together with its cumulative matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLink {
    /// Absolute container path of the record.
    pub path: String,
    pub matrices: Vec<DMat4>,
}

/// Result of resolving a single frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedFrame {
    Single(DMat4),
    /// One matrix per sample of a parametric chain.
    Family(Vec<DMat4>),
    /// Every record of the chain, root first. The last link carries the frame's
    /// own cumulative matrices.
    Chain(Vec<ChainLink>),
}

impl ResolvedFrame {
    pub(crate) fn from_matrices(mut matrices: Vec<DMat4>) -> Self {
        if matrices.len() == 1 {
            ResolvedFrame::Single(matrices.remove(0))
        } else {
            ResolvedFrame::Family(matrices)
        }
    }

    /// Cumulative matrices of the frame itself.
    pub fn matrices(&self) -> &[DMat4] {
        match self {
            ResolvedFrame::Single(matrix) => std::slice::from_ref(matrix),
            ResolvedFrame::Family(matrices) => matrices,
            ResolvedFrame::Chain(links) => links
                .last()
                .map_or(&[][..], |link| link.matrices.as_slice()),
        }
    }

    /// The matrix placed in the scene: the first sample of a family.
    pub fn primary(&self) -> DMat4 {
        self.matrices().first().copied().unwrap_or(DMat4::IDENTITY)
    }

    pub fn chain(&self) -> Option<&[ChainLink]> {
        match self {
            ResolvedFrame::Chain(links) => Some(links),
            _ => None,
        }
    }

    pub fn is_chain(&self) -> bool {
        matches!(self, ResolvedFrame::Chain(_))
    }

    pub fn map_matrices(self, mut f: impl FnMut(DMat4) -> DMat4) -> Self {
        match self {
            ResolvedFrame::Single(matrix) => ResolvedFrame::Single(f(matrix)),
            ResolvedFrame::Family(matrices) => {
                ResolvedFrame::Family(matrices.into_iter().map(&mut f).collect())
            }
            ResolvedFrame::Chain(links) => ResolvedFrame::Chain(
                links
                    .into_iter()
                    .map(|link| ChainLink {
                        path: link.path,
                        matrices: link.matrices.into_iter().map(&mut f).collect(),
                    })
                    .collect(),
            ),
        }
    }
}

/// Frame name to resolved frame, iterated in name order.
pub type FrameMap = BTreeMap<String, ResolvedFrame>;

/// Short display name of a chain link. Leading root group and frame name
/// are stripped, as is every `transformations` group.
pub fn clean_link_name(path: &str, frame_name: &str, root: &str) -> String {
    let root_prefix = format!("/{root}/");

    let name = path.strip_prefix(root_prefix.as_str()).unwrap_or(path);
    let name = name.strip_prefix(frame_name).unwrap_or(name);
    let name = name.strip_prefix("/transformations/").unwrap_or(name);

    name.replace("/transformations", "")
}

#[cfg(test)]
mod test {
    use super::*;
    use glam::DVec3;

    #[test]
    fn primary_is_the_first_sample() {
        let a = DMat4::from_translation(DVec3::X);
        let b = DMat4::from_translation(DVec3::Y);

        assert_eq!(ResolvedFrame::from_matrices(vec![a]), ResolvedFrame::Single(a));

        let family = ResolvedFrame::from_matrices(vec![a, b]);
        assert_eq!(family.primary(), a);
        assert_eq!(family.matrices().len(), 2);
    }

    #[test]
    fn chain_primary_is_the_last_link() {
        let chain = ResolvedFrame::Chain(vec![
            ChainLink {
                path: "/entry/a".to_string(),
                matrices: vec![DMat4::IDENTITY],
            },
            ChainLink {
                path: "/entry/b".to_string(),
                matrices: vec![DMat4::from_translation(DVec3::Z)],
            },
        ]);

        assert!(chain.is_chain());
        assert_eq!(chain.primary(), DMat4::from_translation(DVec3::Z));
        assert_eq!(ResolvedFrame::Chain(Vec::new()).primary(), DMat4::IDENTITY);
    }

    #[test]
    fn link_names_drop_known_prefixes() {
        assert_eq!(
            clean_link_name("/entry/sample/transformations/rot_omg", "sample", "entry"),
            "rot_omg"
        );
        assert_eq!(
            clean_link_name(
                "/entry/instrument/manipulator/transformations/trans_z",
                "sample",
                "entry"
            ),
            "instrument/manipulator/trans_z"
        );
    }
}
