// Scope guard - restores the prior sub-scope on every exit path

use crate::error::Result;
use crate::port::ScopeSwitcher;

pub(crate) struct ScopeGuard<'a> {
    switcher: &'a dyn ScopeSwitcher,
    entered: bool,
}

impl<'a> ScopeGuard<'a> {
    /// Enter `scope` if one is given
    pub(crate) fn enter(switcher: &'a dyn ScopeSwitcher, scope: Option<&str>) -> Result<Self> {
        let entered = match scope {
            Some(scope) => {
                switcher.enter(scope)?;
                true
            }
            None => false,
        };
        Ok(Self { switcher, entered })
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if self.entered {
            self.switcher.restore();
        }
    }
}
