//! The reference backend: serialises each loaded user module to a JSON
//! file named after the module. Backends for real targets follow the same
//! drive pattern over [`LoadedAdl`].

use std::path::PathBuf;

use crate::backend::CodeGen;
use crate::error::{CompileError, Result};
use crate::passes::LoadedAdl;
use crate::writer::FileWriter;

pub struct AstGen;

impl CodeGen for AstGen {
    fn generate(&self, adl: &LoadedAdl, writer: &mut FileWriter) -> Result<()> {
        for module in adl.user_modules() {
            let mut bytes = serde_json::to_vec_pretty(module).map_err(|e| CompileError::Emit {
                message: format!("cannot serialise module {}: {}", module.name, e),
            })?;
            bytes.push(b'\n');
            let rel_path = PathBuf::from(format!("{}.json", module.name));
            writer.write(&rel_path, &bytes)?;
        }
        Ok(())
    }
}
