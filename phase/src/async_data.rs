use std::fmt;
use std::future::Future;

/// Result of an async fetch that may still be pending.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AsyncData<T, E> {
    #[default]
    Loading,
    Success(T),
    Error(E),
}

impl<T, E> AsyncData<T, E> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Render the data.
    ///
    /// - Loading: `loading_view`
    /// - Error: `error_view` applied to the whole state, or `loading_view`
    ///   when no error view is given
    /// - Success: `children` applied to the data, or an empty view
    pub fn render<V: Default>(
        &self,
        loading_view: V,
        error_view: Option<&dyn Fn(&Self) -> V>,
        children: Option<&dyn Fn(&T) -> V>,
    ) -> V {
        match self {
            Self::Loading => loading_view,
            Self::Error(_) => match error_view {
                Some(error_view) => error_view(self),
                None => loading_view,
            },
            Self::Success(data) => {
                children.map(|children| children(data)).unwrap_or_default()
            }
        }
    }
}

impl<T, E> From<Result<T, E>> for AsyncData<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(err) => Self::Error(err),
        }
    }
}

/// Data that is either at hand already or still has to be awaited.
pub enum MaybeAsync<T, E, Fut> {
    Ready(AsyncData<T, E>),
    Pending(Fut),
}

impl<T, E, Fut> MaybeAsync<T, E, Fut> {
    /// Already loaded data.
    pub fn value(data: T) -> Self {
        Self::Ready(AsyncData::Success(data))
    }

    /// What to show before anything is awaited.
    pub fn initial(&self) -> AsyncData<T, E>
    where
        T: Clone,
        E: Clone,
    {
        match self {
            Self::Ready(data) => data.clone(),
            Self::Pending(_) => AsyncData::Loading,
        }
    }
}

impl<T, E, Fut> From<AsyncData<T, E>> for MaybeAsync<T, E, Fut> {
    fn from(data: AsyncData<T, E>) -> Self {
        Self::Ready(data)
    }
}

/// Await `task`, turning a failure into [`AsyncData::Error`] after reporting
/// it through `on_error` (or the error log when there is none).
pub async fn get_async_data<T, E, Fut>(
    task: Fut,
    on_error: Option<&dyn Fn(&E)>,
) -> AsyncData<T, E>
where
    E: fmt::Display,
    Fut: Future<Output = Result<T, E>>,
{
    match task.await {
        Ok(data) => AsyncData::Success(data),
        Err(err) => {
            match on_error {
                Some(on_error) => on_error(&err),
                None => tracing::error!("{err}"),
            }
            AsyncData::Error(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;

    use super::*;
    use crate::test_support::capture_logs;

    type Data = AsyncData<u32, String>;

    #[test]
    fn test_render() {
        let error_view =
            |data: &Data| format!("error: {}", data.error().unwrap());
        let children = |n: &u32| format!("got {n}");

        let loading: Data = AsyncData::Loading;
        assert_eq!(
            loading.render("L".to_string(), Some(&error_view), Some(&children)),
            "L"
        );

        let failed: Data = AsyncData::Error("boom".into());
        assert_eq!(
            failed.render("L".to_string(), Some(&error_view), Some(&children)),
            "error: boom"
        );
        assert_eq!(failed.render("L".to_string(), None, Some(&children)), "L");

        let done: Data = AsyncData::Success(3);
        assert_eq!(
            done.render("L".to_string(), Some(&error_view), Some(&children)),
            "got 3"
        );
        assert_eq!(done.render("L".to_string(), None, None), "");
    }

    #[test]
    fn test_get_async_data_success() {
        let data = block_on(get_async_data(async { Ok::<_, String>(5) }, None));
        assert_eq!(data, AsyncData::Success(5));
        assert_eq!(data.data(), Some(&5));
    }

    #[test]
    fn test_get_async_data_reports_error() {
        let seen = RefCell::new(Vec::new());
        let on_error = |err: &String| seen.borrow_mut().push(err.clone());

        let data: Data = block_on(get_async_data(
            async { Err("boom".to_string()) },
            Some(&on_error),
        ));

        assert_eq!(data, AsyncData::Error("boom".into()));
        assert_eq!(*seen.borrow(), vec!["boom".to_string()]);
    }

    #[test]
    fn test_get_async_data_logs_without_handler() {
        let (data, logs) = capture_logs(|| {
            block_on(get_async_data::<u32, _, _>(
                async { Err("boom".to_string()) },
                None,
            ))
        });
        assert!(data.is_error());
        assert!(logs.contains("boom"));
    }

    #[test]
    fn test_maybe_async_initial() {
        type Source = MaybeAsync<u32, String, futures::future::Ready<()>>;

        assert_eq!(Source::value(4).initial(), AsyncData::Success(4));
        let failed: Source = AsyncData::Error("gone".to_string()).into();
        assert_eq!(failed.initial(), AsyncData::Error("gone".into()));
        let pending: Source = MaybeAsync::Pending(futures::future::ready(()));
        assert!(pending.initial().is_loading());
    }

    #[test]
    fn test_from_result() {
        let data: Data = Ok(1).into();
        assert!(data.is_success());
        let data: Data = Err("x".to_string()).into();
        assert_eq!(data.error().map(String::as_str), Some("x"));
        assert!(Data::default().is_loading());
    }
}
