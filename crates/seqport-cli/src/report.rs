use std::collections::HashMap;
use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use seqport_core::codec::{unpack_dense, DenseBatch};
use seqport_core::{BatchedValue, DType, Element};

/// Prints each output sample as `Seq=i, Sample=j: v0 v1 ...`, outputs in
/// name order.
pub fn write_outputs(out: &mut impl Write, outputs: &HashMap<String, BatchedValue>) -> Result<()> {
    let mut names: Vec<&String> = outputs.keys().collect();
    names.sort();
    for name in names {
        let dense = outputs[name].clone().into_dense()?;
        writeln!(out, "output '{name}' shape={}", dense.shape)?;
        match dense.data.dtype() {
            DType::F32 => write_batch(out, &unpack_dense::<f32>(&dense)?)?,
            DType::F64 => write_batch(out, &unpack_dense::<f64>(&dense)?)?,
        }
    }
    Ok(())
}

fn write_batch<T: Element + Display>(out: &mut impl Write, batch: &DenseBatch<T>) -> Result<()> {
    for seq in 0..batch.num_sequences() {
        for (i, sample) in batch.samples(seq).enumerate() {
            write!(out, "Seq={seq}, Sample={i}:")?;
            for v in sample {
                write!(out, " {v}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqport_core::codec::{pack_dense, pack_sparse};
    use seqport_core::Shape;

    #[test]
    fn prints_every_sample() {
        let scores = pack_dense(&[vec![0.5f32, 1.5, 2.0, 3.0], vec![]], &Shape::from([2])).unwrap();
        let labels = pack_sparse(&[vec![0.0f64, 4.0]], &Shape::from([2])).unwrap();
        let outputs = HashMap::from([
            ("scores".to_string(), scores.into()),
            ("labels".to_string(), labels.into()),
        ]);

        let mut buf = Vec::new();
        write_outputs(&mut buf, &outputs).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "output 'labels' shape=[2]\n\
             Seq=0, Sample=0: 0 4\n\
             output 'scores' shape=[2]\n\
             Seq=0, Sample=0: 0.5 1.5\n\
             Seq=0, Sample=1: 2 3\n"
        );
    }
}
