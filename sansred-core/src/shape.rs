//! Named-dimension shape helpers shared by variables and masks.

use crate::error::{Error, Result};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};

/// Checks that dimension labels are unique and match the array rank.
pub(crate) fn check_dims(dims: &[String], shape: &[usize]) -> Result<()> {
    if dims.len() != shape.len() {
        return Err(Error::shape(
            dims.join(","),
            format!("{} labels for an array of rank {}", dims.len(), shape.len()),
        ));
    }
    for (i, dim) in dims.iter().enumerate() {
        if dims[..i].contains(dim) {
            return Err(Error::shape(dim.clone(), "duplicate dimension label"));
        }
    }
    Ok(())
}

/// Union of two dimension lists: `lhs` order first, then the extras of `rhs`.
pub(crate) fn merge_dims(lhs: &[String], rhs: &[String]) -> Vec<String> {
    let mut dims = lhs.to_vec();
    dims.extend(rhs.iter().filter(|d| !lhs.contains(d)).cloned());
    dims
}

/// Extents for `dims`, looked up in either of two labeled shapes.
pub(crate) fn merge_shape(
    dims: &[String],
    lhs: (&[String], &[usize]),
    rhs: (&[String], &[usize]),
) -> Result<Vec<usize>> {
    dims.iter()
        .map(|dim| {
            let a = lhs.0.iter().position(|d| d == dim).map(|i| lhs.1[i]);
            let b = rhs.0.iter().position(|d| d == dim).map(|i| rhs.1[i]);
            match (a, b) {
                (Some(a), Some(b)) if a != b => Err(Error::shape(
                    dim.clone(),
                    format!("extents {a} and {b} do not agree"),
                )),
                (Some(n), _) | (None, Some(n)) => Ok(n),
                (None, None) => Err(Error::shape(dim.clone(), "unknown dimension")),
            }
        })
        .collect()
}

/// Transposes and broadcasts a labeled array into `target_dims`/`target_shape`.
///
/// Every source dimension must appear in the target with the same extent;
/// target dimensions missing from the source are broadcast.
pub(crate) fn broadcast_labeled<T: Clone>(
    dims: &[String],
    values: ArrayViewD<'_, T>,
    target_dims: &[String],
    target_shape: &[usize],
) -> Result<ArrayD<T>> {
    for (i, dim) in dims.iter().enumerate() {
        let pos = target_dims
            .iter()
            .position(|t| t == dim)
            .ok_or_else(|| Error::shape(dim.clone(), "dimension missing from broadcast target"))?;
        if values.shape()[i] != target_shape[pos] {
            return Err(Error::shape(
                dim.clone(),
                format!(
                    "extent {} cannot broadcast to {}",
                    values.shape()[i],
                    target_shape[pos]
                ),
            ));
        }
    }

    let perm: Vec<usize> = target_dims
        .iter()
        .filter_map(|t| dims.iter().position(|d| d == t))
        .collect();
    let mut view = values.permuted_axes(perm);
    for (pos, dim) in target_dims.iter().enumerate() {
        if !dims.contains(dim) {
            view = view.insert_axis(Axis(pos));
        }
    }

    view.broadcast(IxDyn(target_shape))
        .map(|v| v.as_standard_layout().into_owned())
        .ok_or_else(|| Error::shape(target_dims.join(","), "incompatible broadcast"))
}

/// Merges `merge` (in that order) into one trailing dimension `new_dim`.
pub(crate) fn flatten_labeled<T: Clone>(
    dims: &[String],
    values: ArrayViewD<'_, T>,
    merge: &[String],
    new_dim: &str,
) -> Result<(Vec<String>, ArrayD<T>)> {
    for dim in merge {
        if !dims.contains(dim) {
            return Err(Error::shape(dim.clone(), "cannot flatten a missing dimension"));
        }
    }
    let mut order: Vec<String> = dims.iter().filter(|d| !merge.contains(d)).cloned().collect();
    let outer = order.len();
    order.extend(merge.iter().cloned());
    let shape: Vec<usize> = order
        .iter()
        .map(|d| values.shape()[dims.iter().position(|x| x == d).unwrap_or_default()])
        .collect();

    let permuted = broadcast_labeled(dims, values, &order, &shape)?;
    let mut flat_shape = shape[..outer].to_vec();
    flat_shape.push(shape[outer..].iter().product());
    let flat = permuted
        .into_shape_with_order(IxDyn(&flat_shape))
        .map_err(|e| Error::shape(new_dim, e.to_string()))?;

    order.truncate(outer);
    order.push(new_dim.to_string());
    Ok((order, flat))
}

/// Splits dimension `dim` into consecutive row-major `parts`.
pub(crate) fn fold_labeled<T: Clone>(
    dims: &[String],
    values: ArrayD<T>,
    dim: &str,
    parts: &[(String, usize)],
) -> Result<(Vec<String>, ArrayD<T>)> {
    let axis = dims
        .iter()
        .position(|d| d == dim)
        .ok_or_else(|| Error::shape(dim, "cannot fold a missing dimension"))?;
    let total: usize = parts.iter().map(|(_, n)| n).product();
    if total != values.shape()[axis] {
        return Err(Error::shape(
            dim,
            format!(
                "extent {} cannot be folded into {total} elements",
                values.shape()[axis]
            ),
        ));
    }

    let mut new_dims = dims[..axis].to_vec();
    new_dims.extend(parts.iter().map(|(d, _)| d.clone()));
    new_dims.extend(dims[axis + 1..].iter().cloned());
    check_dims(&new_dims, &vec![0; new_dims.len()])?;

    let mut shape = values.shape()[..axis].to_vec();
    shape.extend(parts.iter().map(|(_, n)| *n));
    shape.extend(values.shape()[axis + 1..].iter().copied());

    let folded = values
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order(IxDyn(&shape))
        .map_err(|e| Error::shape(dim, e.to_string()))?;
    Ok((new_dims, folded))
}
