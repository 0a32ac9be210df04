//! Resolves an editor position to the name/type-name node it falls inside,
//! if any.

use leda_common::{LineIndex, Position};
use leda_parser::{NodeArena, NodeId};

/// The deepest `Name`/`TypeName` node whose range contains `position`, if
/// any. Name-like nodes never nest inside one another, so "deepest" reduces
/// to "smallest containing span" - ties can't arise from genuine nesting,
/// only from two candidates sharing an identical span, in which case either
/// is a correct answer.
#[must_use]
pub fn get_name_at(arena: &NodeArena, line_index: &LineIndex, code: &str, position: Position) -> Option<NodeId> {
    let offset = line_index.position_to_offset(position, code)?;
    arena
        .ids()
        .filter(|&id| arena.kind(id).is_name_like() && arena.span(id).contains(offset))
        .min_by_key(|&id| arena.span(id).len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_name_at_a_local_declaration_site() {
        let parsed = leda_parser::parse("local x = 1");
        let pos = Position::new(0, 6);
        let line_index = LineIndex::build("local x = 1");
        let found = get_name_at(&parsed.arena, &line_index, "local x = 1", pos);
        assert!(found.is_some());
        let node = found.unwrap();
        assert!(matches!(parsed.arena.kind(node), leda_parser::NodeKind::Name(_)));
    }

    #[test]
    fn position_outside_any_name_finds_nothing() {
        let src = "local x = 1";
        let parsed = leda_parser::parse(src);
        let line_index = LineIndex::build(src);
        // Column 8 sits on `=`, not on a name.
        let found = get_name_at(&parsed.arena, &line_index, src, Position::new(0, 8));
        assert!(found.is_none());
    }
}
