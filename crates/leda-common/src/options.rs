//! Small `Copy` configuration structs threaded into the pipeline stages
//! that have a knob, mirroring the checker/binder options structs the
//! teacher workspace keeps in its common crate.

/// Binder-level configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinderOptions {
    /// When `true`, a value name that resolves to nothing is declared as an
    /// implicit global instead of reporting `NameNotFound`, matching plain
    /// Lua's permissive global semantics. Defaults to `false`: Leda's own
    /// resolution is that `global` declarations are the only sanctioned way
    /// to introduce a global, so reading an unbound name is always an
    /// error unless a caller opts into the looser behavior.
    pub allow_implicit_globals: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rejects_implicit_globals() {
        assert!(!BinderOptions::default().allow_implicit_globals);
    }
}
