//! Names bound implicitly by the interpreter, hashed once per context.

use mica_ir::Name;

#[derive(Clone, Debug)]
pub(crate) struct PredefinedNames {
    /// The `this` reference of a call.
    pub(crate) this: Name,
    /// The callee's name, as a string constant.
    pub(crate) func: Name,
    /// Arguments beyond the named parameters.
    pub(crate) varg: Name,
    /// Backtrace of a caught exception.
    pub(crate) backtrace: Name,
    /// Variadic marker in a parameter list.
    pub(crate) ellipsis: Name,
}

impl PredefinedNames {
    pub(crate) fn new() -> Self {
        PredefinedNames {
            this: Name::new("__this"),
            func: Name::new("__func"),
            varg: Name::new("__varg"),
            backtrace: Name::new("__backtrace"),
            ellipsis: Name::new("..."),
        }
    }
}
