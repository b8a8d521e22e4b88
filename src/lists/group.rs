//! Partitions the paragraph flow into runs that become native lists.

use crate::docx::flow::{ParagraphRef, is_blank_text};
use crate::model::{ListFamily, Role};
use crate::xml::NodeId;

use super::detect::{Marker, detect};

/// A paragraph as the grouper sees it.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub paragraph: ParagraphRef,
    pub text: String,
    pub role: Role,
    /// Already bound to native numbering.
    pub native: bool,
}

#[derive(Clone, Debug)]
pub struct GroupItem {
    pub paragraph: ParagraphRef,
    pub marker: Marker,
}

#[derive(Clone, Debug)]
pub struct ListGroup {
    /// Family of the first item; decides the rendered marker.
    pub family: ListFamily,
    pub container: NodeId,
    pub items: Vec<GroupItem>,
}

impl ListGroup {
    pub fn start(&self) -> u32 {
        self.items.first().map_or(1, |i| i.marker.ordinal)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct GroupPlan {
    pub groups: Vec<ListGroup>,
    /// Unmarked list-labelled lead-in paragraphs that stay body text.
    pub preambles: Vec<ParagraphRef>,
    /// Groups dropped for being shorter than the minimum run length.
    pub discarded: usize,
}

struct Accumulator {
    current: Option<ListGroup>,
    family: Option<ListFamily>,
    min_run_len: usize,
    plan: GroupPlan,
}

impl Accumulator {
    fn flush(&mut self) {
        self.family = None;
        let Some(group) = self.current.take() else {
            return;
        };
        if group.len() >= self.min_run_len {
            self.plan.groups.push(group);
        } else {
            log::debug!(
                "Dropping {} group of {} item(s), below minimum run length {}",
                group.family.as_str(),
                group.len(),
                self.min_run_len
            );
            self.plan.discarded += 1;
        }
    }

    /// Whether `marker` continues the open group in `container`.
    fn continues(&self, container: NodeId, marker: &Marker) -> bool {
        let (Some(group), Some(family)) = (&self.current, self.family) else {
            return false;
        };
        if group.container != container {
            return false;
        }
        if family == marker.family {
            return true;
        }
        let previous = group.items.last().map_or(0, |i| i.marker.ordinal);
        family.is_decimal()
            && marker.family.is_decimal()
            && previous.checked_add(1) == Some(marker.ordinal)
    }
}

fn is_preamble(candidate: &Candidate, container: NodeId) -> bool {
    candidate.paragraph.container == container
        && candidate.role == Role::ListItem
        && !candidate.native
        && !is_blank_text(&candidate.text)
        && detect(&candidate.text).is_none()
}

/// Scan the flow once and collect the list groups worth materializing.
pub fn plan_groups(candidates: &[Candidate], min_run_len: usize) -> GroupPlan {
    let mut acc = Accumulator {
        current: None,
        family: None,
        min_run_len: min_run_len.max(1),
        plan: GroupPlan::default(),
    };

    for (i, candidate) in candidates.iter().enumerate() {
        if is_blank_text(&candidate.text)
            || candidate.role == Role::Blank
            || candidate.native
            || candidate.role.is_structural()
        {
            acc.flush();
            continue;
        }
        let Some(marker) = detect(&candidate.text) else {
            acc.flush();
            continue;
        };

        let container = candidate.paragraph.container;
        let item = GroupItem {
            paragraph: candidate.paragraph,
            marker,
        };
        if acc.continues(container, &marker)
            && let Some(group) = acc.current.as_mut()
        {
            group.items.push(item);
            acc.family = Some(marker.family);
            continue;
        }

        acc.flush();
        if let Some(prev) = i.checked_sub(1).map(|p| &candidates[p])
            && is_preamble(prev, container)
            && !acc.plan.preambles.contains(&prev.paragraph)
        {
            acc.plan.preambles.push(prev.paragraph);
        }
        acc.current = Some(ListGroup {
            family: marker.family,
            container,
            items: vec![item],
        });
        acc.family = Some(marker.family);
    }
    acc.flush();
    acc.plan
}
