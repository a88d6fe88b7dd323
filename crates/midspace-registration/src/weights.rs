//! Static registry of the parameter groups each model variant needs.

use burn::tensor::backend::Backend;
use tracing::{debug, error};

use crate::config::RegistrationConfig;
use crate::error::{RegistrationError, Result};
use crate::model::ModelLoader;
use crate::variant::ModelVariant;

/// A named group of parameters, possibly holding nested groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightGroup {
    pub name: &'static str,
    pub children: &'static [WeightGroup],
}

const AFFINE: WeightGroup = WeightGroup {
    name: "affine",
    children: &[],
};

const DEFORM: WeightGroup = WeightGroup {
    name: "deform",
    children: &[],
};

const JOINT: WeightGroup = WeightGroup {
    name: "joint",
    children: &[AFFINE, DEFORM],
};

/// Parameter layout expected for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightLayout {
    variant: ModelVariant,
    root: WeightGroup,
}

impl WeightLayout {
    /// Layout for `variant`. Rigid models share the affine network.
    pub fn for_variant(variant: ModelVariant) -> Self {
        let root = match variant {
            ModelVariant::Affine | ModelVariant::Rigid => AFFINE,
            ModelVariant::Deform => DEFORM,
            ModelVariant::Joint => JOINT,
        };
        Self { variant, root }
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Paths of the leaf groups, e.g. `joint/affine`.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_leaves(&self.root, String::new(), &mut paths);
        paths
    }

    /// Check that every leaf group is offered by at least one parameter.
    pub fn verify<S: AsRef<str>>(&self, parameters: &[S]) -> Result<()> {
        let missing: Vec<String> = self
            .leaf_paths()
            .into_iter()
            .filter(|path| {
                !parameters.iter().any(|p| {
                    let p = p.as_ref();
                    p == path.as_str()
                        || p.strip_prefix(path.as_str())
                            .is_some_and(|rest| rest.starts_with('/'))
                })
            })
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistrationError::weight_load(format!(
                "{} model is missing parameter groups: {}",
                self.variant,
                missing.join(", ")
            )))
        }
    }
}

fn collect_leaves(group: &WeightGroup, prefix: String, out: &mut Vec<String>) {
    let path = if prefix.is_empty() {
        group.name.to_string()
    } else {
        format!("{prefix}/{}", group.name)
    };
    if group.children.is_empty() {
        out.push(path);
    } else {
        for child in group.children {
            collect_leaves(child, path.clone(), out);
        }
    }
}

/// Verify the loader's parameters against the variant layout, then load.
pub fn load_model<B, L>(loader: &L, config: &RegistrationConfig) -> Result<L::Model>
where
    B: Backend,
    L: ModelLoader<B>,
{
    let layout = WeightLayout::for_variant(config.variant);
    let parameters = loader.parameter_names();
    debug!(
        variant = %config.variant,
        parameters = parameters.len(),
        "verifying weight layout"
    );
    if let Err(err) = layout.verify(&parameters) {
        error!("{err}");
        return Err(err);
    }
    loader.load(config.variant, config.extent, &config.compute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_layout_is_nested() {
        let layout = WeightLayout::for_variant(ModelVariant::Joint);
        assert_eq!(layout.leaf_paths(), vec!["joint/affine", "joint/deform"]);
    }

    #[test]
    fn test_verify_accepts_prefixed_parameters() {
        let layout = WeightLayout::for_variant(ModelVariant::Joint);
        let params = ["joint/affine/conv0/kernel", "joint/deform/conv0/kernel"];
        assert!(layout.verify(&params).is_ok());
    }

    #[test]
    fn test_verify_reports_missing_group() {
        let layout = WeightLayout::for_variant(ModelVariant::Joint);
        let params = ["joint/affine/conv0/kernel", "deform/conv0/kernel"];
        match layout.verify(&params) {
            Err(RegistrationError::WeightLoadFailure(msg)) => {
                assert!(msg.contains("joint/deform"));
                assert!(!msg.contains("joint/affine"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_prefix_must_end_at_separator() {
        let layout = WeightLayout::for_variant(ModelVariant::Deform);
        assert!(layout.verify(&["deformable/kernel"]).is_err());
        assert!(layout.verify(&["deform"]).is_ok());
    }

    #[test]
    fn test_rigid_uses_affine_network() {
        let layout = WeightLayout::for_variant(ModelVariant::Rigid);
        assert_eq!(layout.leaf_paths(), vec!["affine"]);
    }
}
