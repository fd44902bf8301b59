#[macro_export]
macro_rules! assert_ids {
    ($result:expr, [ $( $id:expr ),* $(,)? ]) => {
        let ids: Vec<i64> = $result.ids.iter().map(|id| id.0).collect();
        let expect: Vec<i64> = vec![ $( $id ),* ];
        pretty_assertions::assert_eq!(ids, expect);
    };
}

/// Runs each listed test against every backend that needs no external
/// service. Each test is an `async fn(BackendKind)`.
#[macro_export]
macro_rules! tests {
    (
        $(
            $( #[$attrs:meta] )*
            $f:ident
        ),+ $(,)?
    ) => {
        mod in_memory {
            $(
                #[tokio::test]
                $( #[$attrs] )*
                async fn $f() {
                    super::$f($crate::BackendKind::InMemory).await;
                }
            )*
        }

        mod generic_vector {
            $(
                #[tokio::test]
                $( #[$attrs] )*
                async fn $f() {
                    super::$f($crate::BackendKind::GenericVector).await;
                }
            )*
        }
    };
}
