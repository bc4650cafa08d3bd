//! Mutation planning.
//!
//! Compares a resolved draft against the current remote state and emits
//! the minimal ordered action list that makes the remote match. Field
//! policies differ: description and external id can be unset, parent
//! and order hint cannot (the platform rejects it), custom fields diff
//! per field when the type is unchanged and wholesale otherwise. Asset
//! actions are ordered removals → changes → reorder → additions so an
//! add can never collide with a not-yet-removed key.

use crate::error::{SyncError, SyncResult};
use crate::options::SyncOptions;
use crate::validator::duplicate_asset_keys_message;
use merx_types::{Asset, AssetDraft, Category, CategoryDraft, CategoryUpdateAction};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The planned write for one draft.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// No remote counterpart exists; the draft must be created.
    Create,
    /// The counterpart differs; apply these actions in order.
    Update(Vec<CategoryUpdateAction>),
    /// Remote state already matches the draft.
    NoChange,
}

/// Plans update actions from a draft/remote pair.
#[derive(Debug)]
pub struct MutationPlanner {
    options: Arc<SyncOptions>,
}

impl MutationPlanner {
    pub fn new(options: Arc<SyncOptions>) -> Self {
        Self { options }
    }

    /// Produces the plan for one draft. The draft is expected to carry
    /// id-form references (post-resolution).
    pub fn plan(&self, existing: Option<&Category>, draft: &CategoryDraft) -> SyncResult<Plan> {
        let mut seen = BTreeSet::new();
        for asset in &draft.assets {
            if !seen.insert(asset.key.as_str()) {
                return Err(SyncError::Validation(duplicate_asset_keys_message(
                    &draft.key, &asset.key,
                )));
            }
        }

        let Some(existing) = existing else {
            return Ok(Plan::Create);
        };

        let mut actions = Vec::new();

        if draft.name != existing.name {
            actions.push(CategoryUpdateAction::ChangeName {
                name: draft.name.clone(),
            });
        }
        if draft.slug != existing.slug {
            actions.push(CategoryUpdateAction::ChangeSlug {
                slug: draft.slug.clone(),
            });
        }
        if draft.description != existing.description {
            actions.push(CategoryUpdateAction::SetDescription {
                description: draft.description.clone(),
            });
        }

        match (&draft.parent, &existing.parent) {
            (Some(parent), current) if current.as_ref() != Some(parent) => {
                actions.push(CategoryUpdateAction::ChangeParent {
                    parent: parent.clone(),
                });
            }
            (None, Some(_)) => {
                self.options.report_warning(
                    &format!(
                        "Cannot unset 'parent' field of category with key '{}'.",
                        draft.key
                    ),
                    Some(draft),
                );
            }
            _ => {}
        }

        match (&draft.order_hint, &existing.order_hint) {
            (Some(hint), current) if current.as_deref() != Some(hint.as_str()) => {
                actions.push(CategoryUpdateAction::ChangeOrderHint {
                    order_hint: hint.clone(),
                });
            }
            (None, Some(_)) => {
                self.options.report_warning(
                    &format!(
                        "Cannot unset 'orderHint' field of category with key '{}'.",
                        draft.key
                    ),
                    Some(draft),
                );
            }
            _ => {}
        }

        if draft.external_id != existing.external_id {
            actions.push(CategoryUpdateAction::SetExternalId {
                external_id: draft.external_id.clone(),
            });
        }

        plan_custom_fields(draft, existing, &mut actions);
        plan_assets(&draft.assets, &existing.assets, &mut actions);

        if actions.is_empty() {
            Ok(Plan::NoChange)
        } else {
            Ok(Plan::Update(actions))
        }
    }
}

fn plan_custom_fields(
    draft: &CategoryDraft,
    existing: &Category,
    actions: &mut Vec<CategoryUpdateAction>,
) {
    match (&draft.custom, &existing.custom) {
        (None, None) => {}
        (Some(wanted), None) => {
            actions.push(CategoryUpdateAction::SetCustomType {
                type_ref: Some(wanted.type_ref.clone()),
                fields: Some(wanted.fields.clone()),
            });
        }
        (None, Some(_)) => {
            actions.push(CategoryUpdateAction::SetCustomType {
                type_ref: None,
                fields: None,
            });
        }
        (Some(wanted), Some(current)) => {
            if wanted.type_ref != current.type_ref {
                // A type switch replaces the whole block; per-field diffs
                // against the old type's fields would be meaningless.
                actions.push(CategoryUpdateAction::SetCustomType {
                    type_ref: Some(wanted.type_ref.clone()),
                    fields: Some(wanted.fields.clone()),
                });
                return;
            }
            for (name, value) in &wanted.fields {
                if current.fields.get(name) != Some(value) {
                    actions.push(CategoryUpdateAction::SetCustomField {
                        name: name.clone(),
                        value: Some(value.clone()),
                    });
                }
            }
            for name in current.fields.keys() {
                if !wanted.fields.contains_key(name) {
                    actions.push(CategoryUpdateAction::SetCustomField {
                        name: name.clone(),
                        value: None,
                    });
                }
            }
        }
    }
}

fn plan_assets(wanted: &[AssetDraft], current: &[Asset], actions: &mut Vec<CategoryUpdateAction>) {
    let current_by_key: BTreeMap<&str, &Asset> =
        current.iter().map(|a| (a.key.as_str(), a)).collect();
    let wanted_keys: BTreeSet<&str> = wanted.iter().map(|a| a.key.as_str()).collect();

    for asset in current {
        if !wanted_keys.contains(asset.key.as_str()) {
            actions.push(CategoryUpdateAction::RemoveAsset {
                asset_key: asset.key.clone(),
            });
        }
    }

    for asset in wanted {
        let Some(existing) = current_by_key.get(asset.key.as_str()) else {
            continue;
        };
        if asset.name != existing.name {
            actions.push(CategoryUpdateAction::ChangeAssetName {
                asset_key: asset.key.clone(),
                name: asset.name.clone(),
            });
        }
        if asset.sources != existing.sources {
            actions.push(CategoryUpdateAction::SetAssetSources {
                asset_key: asset.key.clone(),
                sources: asset.sources.clone(),
            });
        }
        if asset.tags != existing.tags {
            actions.push(CategoryUpdateAction::SetAssetTags {
                asset_key: asset.key.clone(),
                tags: asset.tags.clone(),
            });
        }
    }

    // Survivors only: additions get their position from AddAsset below.
    let current_survivor_order: Vec<&str> = current
        .iter()
        .map(|a| a.key.as_str())
        .filter(|key| wanted_keys.contains(key))
        .collect();
    let wanted_survivor_order: Vec<&str> = wanted
        .iter()
        .map(|a| a.key.as_str())
        .filter(|key| current_by_key.contains_key(key))
        .collect();
    if current_survivor_order != wanted_survivor_order {
        actions.push(CategoryUpdateAction::ChangeAssetOrder {
            asset_order: wanted_survivor_order
                .iter()
                .map(|key| (*key).to_string())
                .collect(),
        });
    }

    for (position, asset) in wanted.iter().enumerate() {
        if !current_by_key.contains_key(asset.key.as_str()) {
            actions.push(CategoryUpdateAction::AddAsset {
                asset: asset.clone(),
                position: position as u32,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merx_types::{
        AssetSource, CustomFields, CustomFieldsDraft, LocalizedString, Reference, ResourceId,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    fn planner() -> MutationPlanner {
        MutationPlanner::new(Arc::new(SyncOptions::default()))
    }

    fn draft(key: &str) -> CategoryDraft {
        CategoryDraft::new(
            key,
            LocalizedString::of("en", "Shoes"),
            LocalizedString::of("en", "shoes"),
        )
    }

    /// Remote state matching `draft(key)` with no optional fields.
    fn category(key: &str) -> Category {
        Category {
            id: ResourceId::new(),
            version: 1,
            key: key.to_string(),
            name: LocalizedString::of("en", "Shoes"),
            slug: LocalizedString::of("en", "shoes"),
            description: None,
            parent: None,
            order_hint: None,
            external_id: None,
            custom: None,
            assets: Vec::new(),
        }
    }

    fn asset(key: &str, name: &str) -> Asset {
        Asset {
            key: key.to_string(),
            name: LocalizedString::of("en", name),
            sources: Vec::new(),
            tags: Vec::new(),
        }
    }

    fn asset_draft(key: &str, name: &str) -> AssetDraft {
        AssetDraft::new(key, LocalizedString::of("en", name))
    }

    #[test]
    fn absent_counterpart_plans_a_create() {
        assert_eq!(planner().plan(None, &draft("new")).unwrap(), Plan::Create);
    }

    #[test]
    fn identical_state_plans_nothing() {
        let existing = category("shoes");
        assert_eq!(
            planner().plan(Some(&existing), &draft("shoes")).unwrap(),
            Plan::NoChange
        );
    }

    #[test]
    fn changed_core_fields_diff_in_field_order() {
        let existing = category("shoes");
        let wanted = CategoryDraft::new(
            "shoes",
            LocalizedString::of("en", "Fancy shoes"),
            LocalizedString::of("en", "fancy-shoes"),
        )
        .with_external_id("ext-9");

        let plan = planner().plan(Some(&existing), &wanted).unwrap();

        assert_eq!(
            plan,
            Plan::Update(vec![
                CategoryUpdateAction::ChangeName {
                    name: LocalizedString::of("en", "Fancy shoes"),
                },
                CategoryUpdateAction::ChangeSlug {
                    slug: LocalizedString::of("en", "fancy-shoes"),
                },
                CategoryUpdateAction::SetExternalId {
                    external_id: Some("ext-9".to_string()),
                },
            ])
        );
    }

    #[test]
    fn description_is_unset_capable() {
        let mut existing = category("shoes");
        existing.description = Some(LocalizedString::of("en", "old"));

        let plan = planner().plan(Some(&existing), &draft("shoes")).unwrap();

        assert_eq!(
            plan,
            Plan::Update(vec![CategoryUpdateAction::SetDescription {
                description: None,
            }])
        );
    }

    #[test]
    fn parent_change_is_planned() {
        let parent_id = ResourceId::new();
        let existing = category("shoes");
        let wanted = draft("shoes").with_parent(Reference::by_id(parent_id));

        let plan = planner().plan(Some(&existing), &wanted).unwrap();

        assert_eq!(
            plan,
            Plan::Update(vec![CategoryUpdateAction::ChangeParent {
                parent: Reference::by_id(parent_id),
            }])
        );
    }

    #[test]
    fn parent_cannot_be_unset() {
        let warnings = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&warnings);
        let planner = MutationPlanner::new(Arc::new(
            SyncOptions::builder()
                .warning_callback(move |message, _| {
                    sink.lock().unwrap().push(message.to_string());
                })
                .build(),
        ));

        let mut existing = category("shoes");
        existing.parent = Some(Reference::by_id(ResourceId::new()));

        let plan = planner.plan(Some(&existing), &draft("shoes")).unwrap();

        assert_eq!(plan, Plan::NoChange);
        assert_eq!(
            *warnings.lock().unwrap(),
            ["Cannot unset 'parent' field of category with key 'shoes'."]
        );
    }

    #[test]
    fn order_hint_cannot_be_unset() {
        let warnings = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&warnings);
        let planner = MutationPlanner::new(Arc::new(
            SyncOptions::builder()
                .warning_callback(move |message, _| {
                    sink.lock().unwrap().push(message.to_string());
                })
                .build(),
        ));

        let mut existing = category("shoes");
        existing.order_hint = Some("0.5".to_string());

        let plan = planner.plan(Some(&existing), &draft("shoes")).unwrap();

        assert_eq!(plan, Plan::NoChange);
        assert_eq!(
            *warnings.lock().unwrap(),
            ["Cannot unset 'orderHint' field of category with key 'shoes'."]
        );
    }

    #[test]
    fn order_hint_change_is_planned() {
        let mut existing = category("shoes");
        existing.order_hint = Some("0.5".to_string());
        let wanted = draft("shoes").with_order_hint("0.7");

        let plan = planner().plan(Some(&existing), &wanted).unwrap();

        assert_eq!(
            plan,
            Plan::Update(vec![CategoryUpdateAction::ChangeOrderHint {
                order_hint: "0.7".to_string(),
            }])
        );
    }

    #[test]
    fn same_type_custom_fields_diff_per_field() {
        let type_id = ResourceId::new();
        let mut existing = category("shoes");
        existing.custom = Some(CustomFields {
            type_ref: Reference::by_id(type_id),
            fields: [
                ("color".to_string(), json!("red")),
                ("obsolete".to_string(), json!(true)),
            ]
            .into_iter()
            .collect(),
        });

        let wanted = draft("shoes").with_custom(
            CustomFieldsDraft::of_type(Reference::by_id(type_id))
                .with_field("color", json!("blue"))
                .with_field("season", json!("summer")),
        );

        let plan = planner().plan(Some(&existing), &wanted).unwrap();

        assert_eq!(
            plan,
            Plan::Update(vec![
                CategoryUpdateAction::SetCustomField {
                    name: "color".to_string(),
                    value: Some(json!("blue")),
                },
                CategoryUpdateAction::SetCustomField {
                    name: "season".to_string(),
                    value: Some(json!("summer")),
                },
                CategoryUpdateAction::SetCustomField {
                    name: "obsolete".to_string(),
                    value: None,
                },
            ])
        );
    }

    #[test]
    fn type_switch_replaces_the_whole_custom_block() {
        let old_type = ResourceId::new();
        let new_type = ResourceId::new();
        let mut existing = category("shoes");
        existing.custom = Some(CustomFields {
            type_ref: Reference::by_id(old_type),
            fields: [("color".to_string(), json!("red"))].into_iter().collect(),
        });

        let wanted = draft("shoes").with_custom(
            CustomFieldsDraft::of_type(Reference::by_id(new_type)).with_field("fit", json!("wide")),
        );

        let plan = planner().plan(Some(&existing), &wanted).unwrap();

        assert_eq!(
            plan,
            Plan::Update(vec![CategoryUpdateAction::SetCustomType {
                type_ref: Some(Reference::by_id(new_type)),
                fields: Some([("fit".to_string(), json!("wide"))].into_iter().collect()),
            }])
        );
    }

    #[test]
    fn dropping_custom_fields_unsets_the_type() {
        let mut existing = category("shoes");
        existing.custom = Some(CustomFields {
            type_ref: Reference::by_id(ResourceId::new()),
            fields: BTreeMap::new(),
        });

        let plan = planner().plan(Some(&existing), &draft("shoes")).unwrap();

        assert_eq!(
            plan,
            Plan::Update(vec![CategoryUpdateAction::SetCustomType {
                type_ref: None,
                fields: None,
            }])
        );
    }

    #[test]
    fn asset_diff_orders_removals_changes_reorder_then_adds() {
        let mut existing = category("shoes");
        existing.assets = vec![asset("a", "A"), asset("b", "B"), asset("c", "C")];

        let wanted = draft("shoes").with_assets(vec![
            asset_draft("c", "C"),
            asset_draft("a", "A renamed"),
            asset_draft("d", "D"),
        ]);

        let plan = planner().plan(Some(&existing), &wanted).unwrap();

        assert_eq!(
            plan,
            Plan::Update(vec![
                CategoryUpdateAction::RemoveAsset {
                    asset_key: "b".to_string(),
                },
                CategoryUpdateAction::ChangeAssetName {
                    asset_key: "a".to_string(),
                    name: LocalizedString::of("en", "A renamed"),
                },
                CategoryUpdateAction::ChangeAssetOrder {
                    asset_order: vec!["c".to_string(), "a".to_string()],
                },
                CategoryUpdateAction::AddAsset {
                    asset: asset_draft("d", "D"),
                    position: 2,
                },
            ])
        );
    }

    #[test]
    fn asset_source_and_tag_changes_are_planned() {
        let mut existing = category("shoes");
        existing.assets = vec![asset("banner", "Banner")];

        let source = AssetSource::new("https://cdn.merx.dev/banner-v2.png");
        let wanted = draft("shoes").with_assets(vec![asset_draft("banner", "Banner")
            .with_source(source.clone())
            .with_tags(vec!["hero".to_string()])]);

        let plan = planner().plan(Some(&existing), &wanted).unwrap();

        assert_eq!(
            plan,
            Plan::Update(vec![
                CategoryUpdateAction::SetAssetSources {
                    asset_key: "banner".to_string(),
                    sources: vec![source],
                },
                CategoryUpdateAction::SetAssetTags {
                    asset_key: "banner".to_string(),
                    tags: vec!["hero".to_string()],
                },
            ])
        );
    }

    #[test]
    fn unchanged_assets_in_same_order_plan_nothing() {
        let mut existing = category("shoes");
        existing.assets = vec![asset("a", "A"), asset("b", "B")];

        let wanted = draft("shoes").with_assets(vec![asset_draft("a", "A"), asset_draft("b", "B")]);

        assert_eq!(planner().plan(Some(&existing), &wanted).unwrap(), Plan::NoChange);
    }

    #[test]
    fn duplicate_asset_keys_are_a_planning_error() {
        let wanted =
            draft("shoes").with_assets(vec![asset_draft("x", "One"), asset_draft("x", "Two")]);

        let err = planner().plan(None, &wanted).unwrap_err();

        assert_eq!(
            err.to_string(),
            "CategoryDraft with key 'shoes' has duplicate asset keys: 'x'. \
             Asset keys are expected to be unique inside their category."
        );
    }
}
