//! Offline garbage collection: rebuild the trie into a fresh, compact image
//! with no moved or deleted marks.
//!
//! Three phases over an in-memory arena of the live structure:
//! 1. mark: decide which terminals survive (forgetting curve on decaying
//!    dictionaries, incoming bigrams can pin an otherwise-discardable
//!    entry) and propagate liveness up the tree;
//! 2. layout: assign every surviving node its position in the new image,
//!    producing the old-to-new relocation map;
//! 3. copy: serialize nodes with parent links, children links and bigram
//!    targets rewritten through the map.

use std::collections::HashMap;

use tracing::debug;

use super::buffers::{ByteWriter, DictBuffers};
use super::forgetting_curve::{create_historical_info_to_save, needs_to_keep};
use super::pt_node::{self, PtNodeParams, PtNodeSpec};
use super::pt_trie::PtTrieReader;
use super::shortcut_list::ShortcutTarget;
use super::{DictError, DictPos, FormatVersion, MAX_WORD_LENGTH, NOT_A_DICT_POS};

pub(crate) struct GcResult {
    /// New trie body, positioned to start at the root position the caller
    /// supplied.
    pub body: Vec<u8>,
    pub unigram_count: u32,
    pub bigram_count: u32,
}

struct GcEntry {
    params: PtNodeParams,
    parent: Option<usize>,
    children: Vec<usize>,
    shortcuts: Vec<ShortcutTarget>,
    bigrams: Vec<(DictPos, i32)>,
    keep_terminal: bool,
    live: bool,
    new_pos: DictPos,
    new_children_array_pos: DictPos,
}

struct Arena {
    entries: Vec<GcEntry>,
    by_head: HashMap<DictPos, usize>,
    roots: Vec<usize>,
}

/// Collect the live trie reachable from `root_pos` and rebuild it at
/// `new_root_pos`.
pub(crate) fn run(
    buffers: &DictBuffers,
    version: FormatVersion,
    root_pos: DictPos,
    new_root_pos: DictPos,
    now: u32,
) -> Result<GcResult, DictError> {
    let reader = PtTrieReader::new(buffers, version, root_pos);
    let mut arena = collect(&reader, version, now)?;
    mark(&mut arena);
    let (unigram_count, bigram_count) = layout(&mut arena, version, new_root_pos);
    let body = copy(&arena, version, new_root_pos, now);
    debug!(unigram_count, bigram_count, bytes = body.len(), "gc rebuilt trie");
    Ok(GcResult {
        body,
        unigram_count,
        bigram_count,
    })
}

// --- phase 1: mark -------------------------------------------------------

fn collect(reader: &PtTrieReader, version: FormatVersion, now: u32) -> Result<Arena, DictError> {
    let mut arena = Arena {
        entries: Vec::new(),
        by_head: HashMap::new(),
        roots: Vec::new(),
    };
    let root_children = reader.children(reader.root_pos());
    for params in root_children {
        let idx = collect_subtree(reader, &mut arena, params, None, version, now, 0)?;
        arena.roots.push(idx);
    }
    Ok(arena)
}

fn collect_subtree(
    reader: &PtTrieReader,
    arena: &mut Arena,
    params: PtNodeParams,
    parent: Option<usize>,
    version: FormatVersion,
    now: u32,
    depth: usize,
) -> Result<usize, DictError> {
    if depth > MAX_WORD_LENGTH {
        return Err(DictError::Malformed);
    }
    let keep_terminal = params.is_terminal()
        && match (version.has_historical_info(), params.historical.as_ref()) {
            (true, Some(info)) => needs_to_keep(info, now),
            _ => true,
        };
    let shortcuts = reader.shortcut_targets(&params);
    let bigrams = reader
        .bigram_entries(&params)
        .into_iter()
        .map(|e| (e.target_pos, e.probability))
        .collect();
    let head_pos = params.head_pos;
    let children_pos = params.children_pos;
    let idx = arena.entries.len();
    arena.entries.push(GcEntry {
        params,
        parent,
        children: Vec::new(),
        shortcuts,
        bigrams,
        keep_terminal,
        live: false,
        new_pos: NOT_A_DICT_POS,
        new_children_array_pos: NOT_A_DICT_POS,
    });
    arena.by_head.insert(head_pos, idx);
    if children_pos != NOT_A_DICT_POS {
        for child in reader.children(children_pos) {
            let child_idx =
                collect_subtree(reader, arena, child, Some(idx), version, now, depth + 1)?;
            arena.entries[idx].children.push(child_idx);
        }
    }
    Ok(idx)
}

/// Fixpoint over keep/live: a terminal survives if the curve keeps it or a
/// surviving terminal's bigram points at it; a node is live if it is a
/// surviving terminal or has a live descendant.
fn mark(arena: &mut Arena) {
    // live = kept-terminal || any live child, computed bottom-up. The
    // arena is built parent-before-child, so a reverse scan sees children
    // first.
    fn recompute_live(arena: &mut Arena) {
        for i in (0..arena.entries.len()).rev() {
            let has_live_child = arena.entries[i]
                .children
                .iter()
                .any(|&c| arena.entries[c].live);
            let e = &mut arena.entries[i];
            e.live = e.keep_terminal || has_live_child;
        }
    }

    for _ in 0..10 {
        recompute_live(arena);

        let mut changed = false;
        let pinned: Vec<usize> = arena
            .entries
            .iter()
            .filter(|e| e.live && e.keep_terminal)
            .flat_map(|e| e.bigrams.iter())
            .filter_map(|&(target, _)| arena.by_head.get(&target).copied())
            .collect();
        for idx in pinned {
            let e = &mut arena.entries[idx];
            if e.params.is_terminal() && !e.keep_terminal {
                e.keep_terminal = true;
                changed = true;
            }
        }
        if !changed {
            return;
        }
    }
    recompute_live(arena);
}

// --- phase 2: layout -----------------------------------------------------

fn array_header_size(count: usize) -> DictPos {
    if count < 0x80 {
        1
    } else {
        2
    }
}

fn node_size(entry: &GcEntry, version: FormatVersion, live_bigram_count: usize) -> DictPos {
    let mut size = 1 + 3 + 1 + 3 * entry.params.code_points.len() as DictPos + 3;
    if entry.keep_terminal {
        size += 1;
        if version.has_historical_info() {
            size += 7;
        }
    }
    if entry.keep_terminal && !entry.shortcuts.is_empty() {
        let entries: DictPos = entry
            .shortcuts
            .iter()
            .map(|s| 3 + 3 * s.code_points.len() as DictPos)
            .sum();
        size += entries + 3;
    }
    if live_bigram_count > 0 {
        size += 5 * live_bigram_count as DictPos + 3;
    }
    size
}

fn live_bigrams(arena: &Arena, idx: usize) -> Vec<(DictPos, i32)> {
    arena.entries[idx]
        .bigrams
        .iter()
        .filter(|(target, _)| {
            arena
                .by_head
                .get(target)
                .is_some_and(|&t| arena.entries[t].live && arena.entries[t].keep_terminal)
        })
        .copied()
        .collect()
}

fn layout(arena: &mut Arena, version: FormatVersion, new_root_pos: DictPos) -> (u32, u32) {
    let mut unigram_count = 0u32;
    let mut bigram_count = 0u32;
    let roots = arena.roots.clone();
    layout_array(
        arena,
        &roots,
        version,
        new_root_pos,
        &mut unigram_count,
        &mut bigram_count,
    );
    (unigram_count, bigram_count)
}

/// Assign positions for one sibling array and, recursively, every child
/// array below it. Returns the position after the laid-out region.
fn layout_array(
    arena: &mut Arena,
    indices: &[usize],
    version: FormatVersion,
    start: DictPos,
    unigram_count: &mut u32,
    bigram_count: &mut u32,
) -> DictPos {
    let live: Vec<usize> = indices
        .iter()
        .copied()
        .filter(|&i| arena.entries[i].live)
        .collect();
    let mut pos = start + array_header_size(live.len());
    for &idx in &live {
        arena.entries[idx].new_pos = pos;
        let bigram_len = if arena.entries[idx].keep_terminal {
            live_bigrams(arena, idx).len()
        } else {
            0
        };
        if arena.entries[idx].keep_terminal {
            *unigram_count += 1;
            *bigram_count += bigram_len as u32;
        }
        pos += node_size(&arena.entries[idx], version, bigram_len);
    }
    pos += 3; // forward link (always null after GC)

    for &idx in &live {
        let children = arena.entries[idx].children.clone();
        if children.iter().any(|&c| arena.entries[c].live) {
            arena.entries[idx].new_children_array_pos = pos;
            pos = layout_array(arena, &children, version, pos, unigram_count, bigram_count);
        }
    }
    pos
}

// --- phase 3: copy -------------------------------------------------------

fn copy(arena: &Arena, version: FormatVersion, new_root_pos: DictPos, now: u32) -> Vec<u8> {
    let mut writer = ByteWriter::new(new_root_pos);
    let relocation: HashMap<DictPos, DictPos> = arena
        .entries
        .iter()
        .filter(|e| e.live)
        .map(|e| (e.params.head_pos, e.new_pos))
        .collect();
    copy_array(arena, &arena.roots, version, &relocation, now, &mut writer);
    writer.into_bytes()
}

fn copy_array(
    arena: &Arena,
    indices: &[usize],
    version: FormatVersion,
    relocation: &HashMap<DictPos, DictPos>,
    now: u32,
    writer: &mut ByteWriter,
) {
    let live: Vec<usize> = indices
        .iter()
        .copied()
        .filter(|&i| arena.entries[i].live)
        .collect();
    pt_node::write_array_size(writer, live.len());
    for &idx in &live {
        let entry = &arena.entries[idx];
        debug_assert_eq!(writer.position(), entry.new_pos);
        let parent_new_pos = entry
            .parent
            .map(|p| arena.entries[p].new_pos)
            .unwrap_or(NOT_A_DICT_POS);
        let bigrams: Vec<(DictPos, i32)> = if entry.keep_terminal {
            live_bigrams(arena, idx)
                .into_iter()
                .filter_map(|(target, prob)| relocation.get(&target).map(|&t| (t, prob)))
                .collect()
        } else {
            Vec::new()
        };
        let historical = entry
            .params
            .historical
            .as_ref()
            .map(|info| create_historical_info_to_save(info, now));
        pt_node::write_node(
            writer,
            version,
            &PtNodeSpec {
                parent_pos: parent_new_pos,
                code_points: &entry.params.code_points,
                probability: if entry.keep_terminal {
                    entry.params.probability
                } else {
                    super::NOT_A_PROBABILITY
                },
                historical: if entry.keep_terminal { historical } else { None },
                children_pos: entry.new_children_array_pos,
                is_not_a_word: entry.params.is_not_a_word(),
                is_blacklisted: entry.params.is_blacklisted(),
                shortcuts: if entry.keep_terminal { &entry.shortcuts } else { &[] },
                bigrams: &bigrams,
            },
        );
    }
    writer.put_position(NOT_A_DICT_POS);

    for &idx in &live {
        let entry = &arena.entries[idx];
        if entry.new_children_array_pos != NOT_A_DICT_POS {
            debug_assert_eq!(writer.position(), entry.new_children_array_pos);
            copy_array(arena, &entry.children, version, relocation, now, writer);
        }
    }
}
