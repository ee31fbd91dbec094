//! Import resolution.
//!
//! Each imported location is loaded once per interpreter tree: the host
//! resolver supplies the program, a sub-interpreter declares it, and its
//! global scope is cached by location. Imported names are bound lazily as
//! aliases of the exporting program's slots.

use cinder_ir::ast::{Declaration, ImportDecl, Program};
use cinder_ir::{Location, Name};

use super::{Interpreter, LoadedProgram};
use crate::environment::{LazyInit, Mutability};
use crate::errors::{import_failed, import_unavailable, EvalResult};

impl Interpreter {
    #[tracing::instrument(level = "debug", skip_all, fields(location = %import.location))]
    pub(crate) fn import(&mut self, import: &ImportDecl) -> EvalResult<()> {
        let cached = self
            .shared
            .programs
            .borrow()
            .get(&import.location)
            .cloned();
        let LoadedProgram {
            scope: source,
            names: exported,
        } = match cached {
            Some(loaded) => loaded,
            None => self
                .load_program(&import.location)
                .map_err(|err| err.or_location(|| self.range(import.span)))?,
        };

        let names = if import.identifiers.is_empty() {
            exported
        } else {
            import.identifiers.clone()
        };
        for name in names {
            if source.slot(name).is_none() {
                return Err(import_failed(
                    import.location.to_string(),
                    format!("`{}` is not declared", self.name_str(name)),
                )
                .with_location(self.range(import.span)));
            }
            self.globals.declare_lazy(
                name,
                LazyInit::Imported {
                    scope: source.clone(),
                    name,
                },
                Mutability::Constant,
            );
        }
        Ok(())
    }

    /// Resolve, declare and cache the program at `location`.
    fn load_program(&mut self, location: &Location) -> EvalResult<LoadedProgram> {
        let resolver = self
            .shared
            .config
            .import_resolver
            .clone()
            .ok_or_else(|| import_unavailable(location.to_string()))?;
        let program = resolver
            .resolve(location)
            .map_err(|err| import_failed(location.to_string(), err.message))?;
        let names = declared_names(&program);

        let mut sub = self.new_sub_interpreter(program, location.clone());
        let loaded = LoadedProgram {
            scope: sub.globals.clone(),
            names,
        };
        // Cached before declaring, so import cycles resolve to the same scope.
        self.shared
            .programs
            .borrow_mut()
            .insert(location.clone(), loaded.clone());
        sub.ensure_declared()?;
        Ok(loaded)
    }
}

/// Value names a program declares at top level.
pub(crate) fn declared_names(program: &Program) -> Vec<Name> {
    program
        .declarations
        .iter()
        .filter_map(|declaration| match declaration {
            Declaration::Function(decl) => Some(decl.name),
            Declaration::Composite(decl) => Some(decl.name),
            Declaration::Variable(decl) => Some(decl.name),
            Declaration::Interface(_) | Declaration::Import(_) => None,
        })
        .collect()
}
