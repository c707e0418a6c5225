//! Volume-mount correlation
//!
//! Resolves which persistent volume claims a pod template mounts, and where.
//! Only volumes backed by a PVC produce a binding; config, secret and
//! emptyDir volumes carry no storage edge and are dropped.
//!
//! StatefulSets additionally own one claim per replica for every
//! volume-claim template. Those claims never appear in the pod spec; the
//! containers mount the template name, and the claim name is synthesized as
//! `<template>-<statefulset>-<ordinal>`.

use crate::model::VolumeMount;
use crate::naming::stateful_claim_name;
use k8s_openapi::api::core::v1::{Container, PersistentVolumeClaim, Volume};
use std::collections::HashMap;

/// Volume-claim templates of a StatefulSet, with the owner and replica
/// count needed to expand them
#[derive(Debug, Clone, Copy)]
pub struct ClaimTemplates<'a> {
    pub templates: &'a [PersistentVolumeClaim],
    pub owner: &'a str,
    pub replicas: i32,
}

/// Mount metadata captured from a container before the claim is known
#[derive(Debug, Clone)]
struct MountPoint {
    mount_path: String,
    read_only: bool,
}

/// Compute every storage binding for a pod template.
///
/// Inline claims come first in container/mount order, followed by the
/// expanded templates (template order, then ordinal, then mount order).
pub fn correlate(
    containers: &[Container],
    volumes: &[Volume],
    claim_templates: Option<ClaimTemplates<'_>>,
) -> Vec<VolumeMount> {
    let mut mounts = inline_claim_mounts(containers, volumes);

    if let Some(templates) = claim_templates {
        mounts.extend(template_claim_mounts(containers, templates));
    }

    mounts
}

fn inline_claim_mounts(containers: &[Container], volumes: &[Volume]) -> Vec<VolumeMount> {
    let volume_to_claim: HashMap<&str, &str> = volumes
        .iter()
        .filter_map(|vol| {
            vol.persistent_volume_claim
                .as_ref()
                .map(|pvc| (vol.name.as_str(), pvc.claim_name.as_str()))
        })
        .collect();

    container_mounts(containers)
        .filter_map(|(volume_name, point)| {
            volume_to_claim.get(volume_name).map(|claim| VolumeMount {
                claim_name: claim.to_string(),
                mount_path: point.mount_path,
                read_only: point.read_only,
            })
        })
        .collect()
}

fn template_claim_mounts(containers: &[Container], claims: ClaimTemplates<'_>) -> Vec<VolumeMount> {
    let mut mounts = Vec::new();

    for template in claims.templates {
        let Some(template_name) = template.metadata.name.as_deref() else {
            continue;
        };

        // A template no container mounts yields nothing
        let points: Vec<MountPoint> = container_mounts(containers)
            .filter(|(volume_name, _)| *volume_name == template_name)
            .map(|(_, point)| point)
            .collect();

        for ordinal in 0..claims.replicas.max(0) {
            let claim_name = stateful_claim_name(template_name, claims.owner, ordinal);
            mounts.extend(points.iter().map(|point| VolumeMount {
                claim_name: claim_name.clone(),
                mount_path: point.mount_path.clone(),
                read_only: point.read_only,
            }));
        }
    }

    mounts
}

/// Every `(volume name, mount point)` across all containers, in order
fn container_mounts(containers: &[Container]) -> impl Iterator<Item = (&str, MountPoint)> + '_ {
    containers
        .iter()
        .flat_map(|c| c.volume_mounts.iter().flatten())
        .map(|vm| {
            (
                vm.name.as_str(),
                MountPoint {
                    mount_path: vm.mount_path.clone(),
                    read_only: vm.read_only.unwrap_or(false),
                },
            )
        })
}
