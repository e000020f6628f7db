//! 循环依赖检测栈

use parking_lot::Mutex;

use super::error::ContainerError;

/// 正在构造中的令牌，最外层在前
#[derive(Debug, Default)]
pub(crate) struct ResolutionStack {
    frames: Mutex<Vec<&'static str>>,
}

impl ResolutionStack {
    /// `token` 已在构造中时返回错误
    ///
    /// 报告的依赖链从 `token` 首次入栈处开始，并以 `token` 结束。
    pub(crate) fn ensure_acyclic(&self, token: &'static str) -> Result<(), ContainerError> {
        let frames = self.frames.lock();
        match frames.iter().position(|frame| *frame == token) {
            Some(start) => {
                let mut chain: Vec<String> =
                    frames[start..].iter().map(|t| t.to_string()).collect();
                chain.push(token.to_string());
                Err(ContainerError::CircularDependency {
                    token: token.to_string(),
                    chain,
                })
            }
            None => Ok(()),
        }
    }

    /// 压入 `token`，返回的帧在析构时将其弹出
    pub(crate) fn enter(&self, token: &'static str) -> StackFrame<'_> {
        self.frames.lock().push(token);
        StackFrame { stack: self, token }
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.lock().len()
    }
}

/// 单个构造帧的守卫
///
/// 出栈在 `Drop` 中完成，工厂失败或 panic 后栈中都不会残留该令牌。
pub(crate) struct StackFrame<'a> {
    stack: &'a ResolutionStack,
    token: &'static str,
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        let popped = self.stack.frames.lock().pop();
        debug_assert_eq!(popped, Some(self.token));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_pops_on_drop() {
        let stack = ResolutionStack::default();
        {
            let _a = stack.enter("a");
            let _b = stack.enter("b");
            assert_eq!(stack.depth(), 2);
        }
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_cycle_chain_starts_at_first_occurrence() {
        let stack = ResolutionStack::default();
        let _root = stack.enter("root");
        let _a = stack.enter("a");
        let _b = stack.enter("b");

        let error = stack.ensure_acyclic("a").unwrap_err();
        match error {
            ContainerError::CircularDependency { token, chain } => {
                assert_eq!(token, "a");
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(stack.ensure_acyclic("c").is_ok());
    }

    #[test]
    fn test_frame_pops_during_unwind() {
        let stack = ResolutionStack::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _frame = stack.enter("boom");
            panic!("factory panicked");
        }));
        assert!(result.is_err());
        assert_eq!(stack.depth(), 0);
    }
}
